pub mod local_user_auth_provider;
