use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which of the three partitions a gallery image lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationOutcome {
    Matched,
    UnmatchedWithPerson,
    NoPersonDetected,
}

impl ClassificationOutcome {
    pub const ALL: [ClassificationOutcome; 3] = [
        ClassificationOutcome::Matched,
        ClassificationOutcome::UnmatchedWithPerson,
        ClassificationOutcome::NoPersonDetected,
    ];
}

/// What the target phase managed to extract from the target image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    SignatureExtracted,
    NoFaceDetected,
    Unreadable,
    EncodingFailed,
}

/// A classified image: its display name and where it was stored.
///
/// `url` is `None` when the blob store rejected the image; the image still
/// counts in its partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedImage {
    pub name: String,
    pub url: Option<String>,
}

impl ClassifiedImage {
    pub fn new(name: impl Into<String>, url: Option<String>) -> Self {
        Self {
            name: name.into(),
            url,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.url.is_some()
    }
}

/// Result of one classification call. Immutable once assembled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRun {
    created_at: DateTime<Utc>,
    target: ClassifiedImage,
    target_status: TargetStatus,
    matched: Vec<ClassifiedImage>,
    unmatched_with_person: Vec<ClassifiedImage>,
    no_person_detected: Vec<ClassifiedImage>,
}

impl ClassificationRun {
    /// Partitions `items` by outcome, keeping input order within each partition.
    pub fn assemble(
        created_at: DateTime<Utc>,
        target: ClassifiedImage,
        target_status: TargetStatus,
        items: impl IntoIterator<Item = (ClassificationOutcome, ClassifiedImage)>,
    ) -> Self {
        let mut run = Self {
            created_at,
            target,
            target_status,
            matched: Vec::new(),
            unmatched_with_person: Vec::new(),
            no_person_detected: Vec::new(),
        };
        for (outcome, image) in items {
            match outcome {
                ClassificationOutcome::Matched => run.matched.push(image),
                ClassificationOutcome::UnmatchedWithPerson => run.unmatched_with_person.push(image),
                ClassificationOutcome::NoPersonDetected => run.no_person_detected.push(image),
            }
        }
        run
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn target(&self) -> &ClassifiedImage {
        &self.target
    }

    pub fn target_status(&self) -> TargetStatus {
        self.target_status
    }

    pub fn matched(&self) -> &[ClassifiedImage] {
        &self.matched
    }

    pub fn unmatched_with_person(&self) -> &[ClassifiedImage] {
        &self.unmatched_with_person
    }

    pub fn no_person_detected(&self) -> &[ClassifiedImage] {
        &self.no_person_detected
    }

    pub fn partition(&self, outcome: ClassificationOutcome) -> &[ClassifiedImage] {
        match outcome {
            ClassificationOutcome::Matched => &self.matched,
            ClassificationOutcome::UnmatchedWithPerson => &self.unmatched_with_person,
            ClassificationOutcome::NoPersonDetected => &self.no_person_detected,
        }
    }

    /// Total number of classified gallery images.
    pub fn len(&self) -> usize {
        ClassificationOutcome::ALL
            .iter()
            .map(|outcome| self.partition(*outcome).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of classified images whose blob could not be stored.
    pub fn unstored_count(&self) -> usize {
        ClassificationOutcome::ALL
            .iter()
            .flat_map(|outcome| self.partition(*outcome))
            .filter(|img| !img.is_stored())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ClassificationOutcome::*;

    fn img(name: &str) -> ClassifiedImage {
        ClassifiedImage::new(name, Some(format!("file:///{name}")))
    }

    fn run(items: Vec<(ClassificationOutcome, ClassifiedImage)>) -> ClassificationRun {
        ClassificationRun::assemble(
            Utc::now(),
            img("target.jpg"),
            TargetStatus::SignatureExtracted,
            items,
        )
    }

    #[test]
    fn test_assemble_partitions_preserving_order() {
        let r = run(vec![
            (NoPersonDetected, img("c")),
            (Matched, img("a")),
            (UnmatchedWithPerson, img("b")),
            (Matched, img("d")),
        ]);

        let names = |xs: &[ClassifiedImage]| xs.iter().map(|i| i.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(r.matched()), vec!["a", "d"]);
        assert_eq!(names(r.unmatched_with_person()), vec!["b"]);
        assert_eq!(names(r.no_person_detected()), vec!["c"]);
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn test_assemble_empty() {
        let r = run(vec![]);
        assert!(r.is_empty());
        assert!(r.matched().is_empty());
        assert!(r.unmatched_with_person().is_empty());
        assert!(r.no_person_detected().is_empty());
    }

    #[test]
    fn test_unstored_count() {
        let r = run(vec![
            (Matched, img("a")),
            (UnmatchedWithPerson, ClassifiedImage::new("b", None)),
            (NoPersonDetected, ClassifiedImage::new("c", None)),
        ]);
        assert_eq!(r.unstored_count(), 2);
        assert!(!r.partition(UnmatchedWithPerson)[0].is_stored());
    }

    #[test]
    fn test_serializes_with_snake_case_partitions() {
        let r = run(vec![(UnmatchedWithPerson, ClassifiedImage::new("b", None))]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["unmatched_with_person"][0]["name"], "b");
        assert!(json["unmatched_with_person"][0]["url"].is_null());
        assert_eq!(json["target_status"], "signature_extracted");
    }
}
