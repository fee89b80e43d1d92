use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use findme_core::auth::domain::auth_provider::{AuthProvider, Credentials, Identity};
use findme_core::auth::infrastructure::local_user_auth_provider::LocalUserAuthProvider;
use findme_core::detection::domain::face_model::FaceModel;
use findme_core::detection::infrastructure::onnx_face_model::OnnxFaceModel;
use findme_core::imaging::infrastructure::exif_image_normalizer::ExifImageNormalizer;
use findme_core::pipeline::classify_gallery_use_case::{ClassifierOptions, GalleryClassifier};
use findme_core::pipeline::count_faces_use_case::CountFacesUseCase;
use findme_core::pipeline::infrastructure::threaded_classification_executor::ThreadedClassificationExecutor;
use findme_core::pipeline::pipeline_executor::{
    ClassificationExecutor, ClassificationRequest, DispatchConfig,
};
use findme_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use findme_core::pipeline::run_recorder::RunRecorder;
use findme_core::shared::constants::{
    APP_DIR_NAME, DEFAULT_DETECTION_CONFIDENCE, DEFAULT_REQUEST_TIMEOUT_SECS, IMAGE_EXTENSIONS,
};
use findme_core::shared::gallery_image::GalleryImage;
use findme_core::shared::model_resolver::ModelResolver;
use findme_core::storage::domain::result_store::ResultStore;
use findme_core::storage::infrastructure::file_blob_store::FileBlobStore;
use findme_core::storage::infrastructure::sqlite_result_store::SqliteResultStore;

/// Find one person across a gallery of photos.
#[derive(Parser)]
#[command(name = "findme", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split gallery images into matched, other people, and no people.
    Classify(ClassifyArgs),
    /// Show previous classification runs, newest first.
    History(HistoryArgs),
    /// Count the faces in each image.
    Faces(FacesArgs),
}

#[derive(Args)]
struct ClassifyArgs {
    /// User the run is recorded for.
    #[arg(long)]
    user: String,

    /// Image of the person to look for.
    #[arg(long)]
    target: PathBuf,

    /// Gallery image files or directories of images.
    gallery: Vec<PathBuf>,

    /// Where classified images are stored (default: platform data dir).
    #[arg(long)]
    blob_dir: Option<PathBuf>,

    /// Public URL prefix for stored images; file:// URLs are used otherwise.
    #[arg(long)]
    base_url: Option<String>,

    /// Results database (default: platform data dir).
    #[arg(long)]
    db: Option<PathBuf>,

    /// Worker threads (0 = one per core).
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Give up on the run after this many seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args)]
struct HistoryArgs {
    /// User whose runs to show.
    #[arg(long)]
    user: String,

    /// Results database (default: platform data dir).
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Args)]
struct FacesArgs {
    /// Images to check.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args)]
struct ModelArgs {
    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_DETECTION_CONFIDENCE)]
    confidence: f64,

    /// Directory with bundled model files, checked before downloading.
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Classify(args) => run_classify(args),
        Command::History(args) => run_history(args),
        Command::Faces(args) => run_faces(args),
    }
}

fn run_classify(args: ClassifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_classify(&args)?;
    let identity = authenticate(&args.user)?;

    let target = load_image(&args.target)?;
    let gallery = load_gallery(&collect_gallery(&args.gallery)?);
    log::info!("Classifying {} gallery images", gallery.len());

    let options = ClassifierOptions {
        threads: args.threads,
    };
    let model = load_model(&args.model)?;

    let blob_root = match args.blob_dir {
        Some(dir) => dir,
        None => data_dir()?.join("blobs"),
    };
    let mut blob_store = FileBlobStore::new(blob_root);
    if let Some(base_url) = args.base_url {
        blob_store = blob_store.with_base_url(base_url);
    }
    let results = open_results(args.db)?;

    let classifier = GalleryClassifier::new(
        Arc::new(ExifImageNormalizer::new()),
        model,
        Arc::new(blob_store),
    );
    let executor =
        ThreadedClassificationExecutor::new(classifier, RunRecorder::new(results), &options)?;

    let config = DispatchConfig::new(Duration::from_secs(args.timeout_secs))
        .with_logger(Box::new(StdoutPipelineLogger::default()));
    let response = executor.execute(ClassificationRequest::new(identity, target, gallery), config)?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn run_history(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let identity = authenticate(&args.user)?;
    let records = open_results(args.db)?.list(&identity.user_id)?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run_faces(args: FacesArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_model_args(&args.model)?;
    let use_case = CountFacesUseCase::new(Arc::new(ExifImageNormalizer::new()), load_model(&args.model)?);

    for path in &args.images {
        let counted = fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| use_case.execute(&bytes).map_err(|e| e.to_string()));
        match counted {
            Ok(n) => println!("{}: {n} face(s)", path.display()),
            Err(e) => println!("{}: error: {e}", path.display()),
        }
    }
    Ok(())
}

fn validate_classify(args: &ClassifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.target.is_file() {
        return Err(format!("Target image not found: {}", args.target.display()).into());
    }
    for path in &args.gallery {
        if !path.exists() {
            return Err(format!("Gallery path not found: {}", path.display()).into());
        }
    }
    if args.timeout_secs == 0 {
        return Err("Timeout must be at least 1 second".into());
    }
    if let Some(base_url) = &args.base_url {
        if base_url.trim_end_matches('/').is_empty() {
            return Err("Base URL must not be empty".into());
        }
    }
    validate_model_args(&args.model)
}

fn validate_model_args(model: &ModelArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&model.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            model.confidence
        )
        .into());
    }
    if let Some(dir) = &model.models_dir {
        if !dir.is_dir() {
            return Err(format!("Models directory not found: {}", dir.display()).into());
        }
    }
    Ok(())
}

fn authenticate(user: &str) -> Result<Identity, Box<dyn std::error::Error>> {
    Ok(LocalUserAuthProvider::new().authenticate(&Credentials::new(user))?)
}

fn load_model(args: &ModelArgs) -> Result<Arc<dyn FaceModel>, Box<dyn std::error::Error>> {
    let resolver = ModelResolver::with_default_cache(args.models_dir.clone())?;
    let model = OnnxFaceModel::load(&resolver, args.confidence, 1, Some(download_progress))?;
    Ok(Arc::new(model))
}

fn open_results(db: Option<PathBuf>) -> Result<Arc<dyn ResultStore>, Box<dyn std::error::Error>> {
    let path = match db {
        Some(path) => path,
        None => data_dir()?.join("results.sqlite3"),
    };
    Ok(Arc::new(SqliteResultStore::open(&path)?))
}

fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .ok_or_else(|| "Could not determine data directory".into())
}

fn load_image(path: &Path) -> Result<GalleryImage, Box<dyn std::error::Error>> {
    let bytes = fs::read(path).map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
    Ok(GalleryImage::new(display_name(path), bytes))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Loads every gallery file. A file that cannot be read is kept with no
/// bytes so it is classified as having no person instead of failing the run.
fn load_gallery(paths: &[PathBuf]) -> Vec<GalleryImage> {
    paths
        .iter()
        .map(|path| {
            load_image(path).unwrap_or_else(|e| {
                log::warn!("{e}; classifying as unreadable");
                GalleryImage::new(display_name(path), Vec::new())
            })
        })
        .collect()
}

/// Expands directories (non-recursively, sorted by name) into image files.
/// Explicitly listed files are kept whatever their extension.
fn collect_gallery(paths: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face model... {downloaded} bytes");
    }
}
