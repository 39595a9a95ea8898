use crate::edit::{self, BulkField, Direction, LessonPatch, NEW_LESSON_TITLE};
use crate::model::{
    CurriculumData, FullDataset, Grade, Lesson, LessonId, Semester, Topic, ANCHOR_SUBJECT,
    MAX_LESSON_PERIODS,
};
use crate::setup::LessonDefaults;
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, warn};

/// Blob key holding the serialized full dataset.
pub const STORAGE_KEY: &str = "eduplan_data_v4";

static DEFAULT_CURRICULUM_JSON: &str = include_str!("../data/default_curriculum.json");

/// Opaque string-keyed storage for the serialized dataset.
pub trait BlobStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn with_blob(key: &str, value: &str) -> Self {
        let mut blobs = HashMap::new();
        blobs.insert(key.to_string(), value.to_string());
        MemoryBlobStore { blobs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(|s| s.as_str())
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub lessons: usize,
    pub normalized_ids: usize,
    pub duplicate_ids: Vec<String>,
    /// Lessons whose declared periods exceeded the cap and were lowered.
    pub clamped_periods: usize,
}

impl IngestReport {
    pub fn needs_migration(&self) -> bool {
        self.normalized_ids > 0 || !self.duplicate_ids.is_empty()
    }
}

fn count_numeric_ids(value: &JsonValue) -> usize {
    let Some(subjects) = value.as_object() else {
        return 0;
    };
    subjects
        .values()
        .filter_map(|grades| grades.as_object())
        .flat_map(|grades| grades.values())
        .filter_map(|topics| topics.as_array())
        .flatten()
        .filter_map(|topic| topic.get("lessons").and_then(|l| l.as_array()))
        .flatten()
        .filter(|lesson| lesson.get("id").map(|id| id.is_number()).unwrap_or(false))
        .count()
}

/// Parses a full dataset, normalizing ids to text and reporting anything
/// that needs migration.
pub fn ingest(value: JsonValue) -> anyhow::Result<(FullDataset, IngestReport)> {
    let normalized_ids = count_numeric_ids(&value);
    let mut data: FullDataset =
        serde_json::from_value(value).context("dataset does not match the curriculum layout")?;

    let mut clamped_periods = 0usize;
    for lesson in data
        .values_mut()
        .flat_map(|c| c.values_mut())
        .flatten()
        .flat_map(|t| t.lessons.iter_mut())
    {
        if let Some(p) = lesson.periods.filter(|p| *p > MAX_LESSON_PERIODS) {
            warn!(lesson = %lesson.id, periods = p, "period count above cap");
            lesson.periods = Some(MAX_LESSON_PERIODS);
            clamped_periods += 1;
        }
    }

    let mut seen = HashSet::new();
    let mut duplicate_ids = Vec::new();
    let mut lessons = 0usize;
    for lesson in data
        .values()
        .flat_map(|c| c.values())
        .flatten()
        .flat_map(|t| t.lessons.iter())
    {
        lessons += 1;
        if !seen.insert(lesson.id.as_str()) && !duplicate_ids.iter().any(|d| d == lesson.id.as_str()) {
            duplicate_ids.push(lesson.id.to_string());
        }
    }
    Ok((
        data,
        IngestReport {
            lessons,
            normalized_ids,
            duplicate_ids,
            clamped_periods,
        },
    ))
}

pub fn has_bundled_default(subject: &str) -> bool {
    subject == ANCHOR_SUBJECT
}

/// Bundled curriculum for subjects that ship one (the anchor subject only).
pub fn bundled_default(subject: &str) -> Option<CurriculumData> {
    if !has_bundled_default(subject) {
        return None;
    }
    match serde_json::from_str::<CurriculumData>(DEFAULT_CURRICULUM_JSON) {
        Ok(data) => Some(data),
        Err(e) => {
            error!("bundled curriculum is invalid: {e}");
            None
        }
    }
}

pub fn seed_dataset() -> FullDataset {
    let mut data = FullDataset::new();
    data.insert(
        ANCHOR_SUBJECT.to_string(),
        bundled_default(ANCHOR_SUBJECT).unwrap_or_default(),
    );
    data
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LoadSource {
    Stored,
    Seeded { reason: String },
}

/// Strictly increasing millisecond ids.
#[derive(Debug, Clone)]
pub struct IdClock {
    last: i64,
}

impl IdClock {
    pub fn seeded(data: &FullDataset) -> Self {
        let mut clock = IdClock { last: 0 };
        clock.observe(data.values().flat_map(|c| c.values()).flatten());
        clock
    }

    /// Raises the floor past every numeric id in `topics`.
    fn observe<'a>(&mut self, topics: impl Iterator<Item = &'a Topic>) {
        let max = topics
            .flat_map(|t| t.lessons.iter())
            .filter_map(|l| l.id.numeric())
            .max()
            .unwrap_or(0);
        self.last = self.last.max(max);
    }

    /// Millisecond timestamp, bumped past the last id handed out. Once the
    /// floor sits at `i64::MAX` the bare timestamp is used.
    pub fn next_id(&mut self) -> LessonId {
        let now = Utc::now().timestamp_millis();
        let id = match self.last.checked_add(1) {
            Some(floor) => now.max(floor),
            None => now,
        };
        self.last = self.last.max(id);
        LessonId::new(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResetOutcome {
    NoDefault,
    NeedsConfirmation,
    Reset,
}

pub struct CurriculumStore<B: BlobStore> {
    data: FullDataset,
    backend: B,
    clock: IdClock,
    load_source: LoadSource,
    report: IngestReport,
}

impl<B: BlobStore> CurriculumStore<B> {
    /// Loads the persisted dataset, falling back to the bundled seed when the
    /// blob is missing or unreadable. Never fails.
    pub fn open(backend: B) -> Self {
        let loaded = match backend.load(STORAGE_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<JsonValue>(&raw)
                .context("stored dataset is not JSON")
                .and_then(ingest)
                .map_err(|e| format!("{e:#}")),
            Ok(None) => Err("no stored dataset".to_string()),
            Err(e) => Err(format!("storage read failed: {e:#}")),
        };

        let (data, report, load_source) = match loaded {
            Ok((data, report)) => {
                info!(lessons = report.lessons, "loaded stored curriculum");
                if report.needs_migration() {
                    warn!(
                        normalized_ids = report.normalized_ids,
                        duplicate_ids = report.duplicate_ids.len(),
                        "stored curriculum has non-canonical lesson ids"
                    );
                }
                (data, report, LoadSource::Stored)
            }
            Err(reason) => {
                warn!("seeding default curriculum: {reason}");
                (seed_dataset(), IngestReport::default(), LoadSource::Seeded { reason })
            }
        };

        let seeded = matches!(load_source, LoadSource::Seeded { .. });
        let mut store = CurriculumStore {
            clock: IdClock::seeded(&data),
            data,
            backend,
            load_source,
            report,
        };
        if seeded {
            if let Err(e) = store.persist() {
                error!("failed to persist seeded curriculum: {e:#}");
            }
        }
        store
    }

    pub fn data(&self) -> &FullDataset {
        &self.data
    }

    pub fn subject(&self, subject: &str) -> Option<&CurriculumData> {
        self.data.get(subject)
    }

    pub fn topics(&self, subject: &str, grade: Grade) -> &[Topic] {
        crate::model::grade_topics(&self.data, subject, grade)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn load_source(&self) -> &LoadSource {
        &self.load_source
    }

    pub fn ingest_report(&self) -> &IngestReport {
        &self.report
    }

    pub fn next_id(&mut self) -> LessonId {
        self.clock.next_id()
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        let raw = serde_json::to_string(&self.data).context("failed to serialize curriculum")?;
        self.backend
            .save(STORAGE_KEY, &raw)
            .context("failed to write curriculum blob")?;
        debug!(bytes = raw.len(), "curriculum persisted");
        Ok(())
    }

    /// The single write primitive: swaps one grade's topic list and persists.
    pub fn replace_grade_topics(
        &mut self,
        subject: &str,
        grade: Grade,
        topics: Vec<Topic>,
    ) -> anyhow::Result<()> {
        self.data
            .entry(subject.to_string())
            .or_default()
            .insert(grade, topics);
        self.persist()
    }

    /// Installs `data` as the whole of `subject`. Lesson ids already held by
    /// another subject are re-issued; the displaced ids are returned.
    pub fn replace_subject(
        &mut self,
        subject: &str,
        mut data: CurriculumData,
    ) -> anyhow::Result<Vec<String>> {
        let taken: HashSet<String> = self
            .data
            .iter()
            .filter(|(name, _)| name.as_str() != subject)
            .flat_map(|(_, c)| c.values())
            .flatten()
            .flat_map(|t| t.lessons.iter())
            .map(|l| l.id.to_string())
            .collect();
        self.clock.observe(data.values().flatten());
        let mut reissued = Vec::new();
        for lesson in data
            .values_mut()
            .flatten()
            .flat_map(|t| t.lessons.iter_mut())
        {
            if taken.contains(lesson.id.as_str()) {
                reissued.push(lesson.id.to_string());
                lesson.id = self.clock.next_id();
            }
        }
        if !reissued.is_empty() {
            warn!(subject, count = reissued.len(), "re-issued lesson ids held by other subjects");
        }
        self.data.insert(subject.to_string(), data);
        self.reseed_clock();
        self.persist()?;
        Ok(reissued)
    }

    pub fn replace_all(&mut self, data: FullDataset) -> anyhow::Result<()> {
        self.data = data;
        self.reseed_clock();
        self.persist()
    }

    fn reseed_clock(&mut self) {
        let floor = IdClock::seeded(&self.data).last;
        self.clock.last = self.clock.last.max(floor);
    }

    fn apply(&mut self, subject: &str, grade: Grade, next: Option<Vec<Topic>>) -> anyhow::Result<bool> {
        match next {
            Some(topics) => {
                self.replace_grade_topics(subject, grade, topics)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn add_lesson(
        &mut self,
        subject: &str,
        grade: Grade,
        defaults: &LessonDefaults,
    ) -> anyhow::Result<LessonId> {
        let id = self.next_id();
        let mut lesson = Lesson::new(id.clone(), NEW_LESSON_TITLE);
        lesson.yccd = vec![String::new()];
        lesson.periods = Some(defaults.periods);
        lesson.equipment = Some(defaults.equipment.clone());
        lesson.location = Some(defaults.location.clone());
        let next = edit::add_lesson(self.topics(subject, grade), lesson);
        self.replace_grade_topics(subject, grade, next)?;
        Ok(id)
    }

    pub fn add_topic(&mut self, subject: &str, grade: Grade) -> anyhow::Result<()> {
        let next = edit::add_topic(self.topics(subject, grade));
        self.replace_grade_topics(subject, grade, next)
    }

    pub fn delete_lesson(&mut self, subject: &str, grade: Grade, id: &str) -> anyhow::Result<bool> {
        let next = edit::delete_lesson(self.topics(subject, grade), id);
        self.apply(subject, grade, next)
    }

    pub fn move_lesson(
        &mut self,
        subject: &str,
        grade: Grade,
        id: &str,
        dir: Direction,
    ) -> anyhow::Result<bool> {
        let next = edit::move_lesson(self.topics(subject, grade), id, dir);
        self.apply(subject, grade, next)
    }

    pub fn move_topic(
        &mut self,
        subject: &str,
        grade: Grade,
        index: usize,
        dir: Direction,
    ) -> anyhow::Result<bool> {
        let next = edit::move_topic(self.topics(subject, grade), index, dir);
        self.apply(subject, grade, next)
    }

    pub fn reorder_lesson(
        &mut self,
        subject: &str,
        grade: Grade,
        id: &str,
        target_topic: usize,
        target_lesson: usize,
    ) -> anyhow::Result<bool> {
        let next = edit::reorder_lesson(self.topics(subject, grade), id, target_topic, target_lesson);
        self.apply(subject, grade, next)
    }

    pub fn bulk_set(&mut self, subject: &str, grade: Grade, field: &BulkField) -> anyhow::Result<bool> {
        let next = edit::bulk_set(self.topics(subject, grade), field);
        self.apply(subject, grade, next)
    }

    pub fn update_lesson(
        &mut self,
        subject: &str,
        grade: Grade,
        id: &str,
        patch: &LessonPatch,
    ) -> anyhow::Result<bool> {
        let next = edit::update_lesson(self.topics(subject, grade), id, patch);
        self.apply(subject, grade, next)
    }

    pub fn update_topic(
        &mut self,
        subject: &str,
        grade: Grade,
        index: usize,
        title: Option<&str>,
        semester: Option<Semester>,
    ) -> anyhow::Result<bool> {
        let next = edit::update_topic(self.topics(subject, grade), index, title, semester);
        self.apply(subject, grade, next)
    }

    /// Rewrites one lesson through `f`; `None` from `f` leaves everything as is.
    pub fn edit_lesson<F>(&mut self, subject: &str, grade: Grade, id: &str, f: F) -> anyhow::Result<bool>
    where
        F: FnOnce(&Lesson) -> Option<Lesson>,
    {
        let next = edit::with_lesson(self.topics(subject, grade), id, f);
        self.apply(subject, grade, next)
    }

    pub fn split_lesson(
        &mut self,
        subject: &str,
        grade: Grade,
        id: &str,
    ) -> anyhow::Result<Option<LessonId>> {
        let new_id = self.next_id();
        let next = edit::split_lesson(self.topics(subject, grade), id, new_id.clone());
        Ok(self.apply(subject, grade, next)?.then_some(new_id))
    }

    pub fn merge_next(&mut self, subject: &str, grade: Grade, id: &str) -> anyhow::Result<bool> {
        let next = edit::merge_next(self.topics(subject, grade), id);
        self.apply(subject, grade, next)
    }

    pub fn merge_previous(&mut self, subject: &str, grade: Grade, id: &str) -> anyhow::Result<bool> {
        let next = edit::merge_previous(self.topics(subject, grade), id);
        self.apply(subject, grade, next)
    }

    pub fn reset_subject(&mut self, subject: &str, confirmed: bool) -> anyhow::Result<ResetOutcome> {
        let Some(default) = bundled_default(subject) else {
            info!(subject, "reset refused: no bundled default");
            return Ok(ResetOutcome::NoDefault);
        };
        if !confirmed {
            return Ok(ResetOutcome::NeedsConfirmation);
        }
        self.replace_subject(subject, default)?;
        info!(subject, "subject reset to bundled default");
        Ok(ResetOutcome::Reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> LessonDefaults {
        LessonDefaults::default()
    }

    #[test]
    fn bundled_curriculum_parses_with_unique_ids() {
        let data = bundled_default(ANCHOR_SUBJECT).expect("bundled default");
        assert_eq!(data.len(), 4);
        assert!(bundled_default("Toán").is_none());
        let full = FullDataset::from([(ANCHOR_SUBJECT.to_string(), data)]);
        let (_, report) = ingest(serde_json::to_value(&full).expect("to json")).expect("ingest");
        assert!(report.lessons > 0);
        assert!(!report.needs_migration());
    }

    #[test]
    fn corrupt_blob_falls_back_to_seed() {
        let store = CurriculumStore::open(MemoryBlobStore::with_blob(STORAGE_KEY, "{not json"));
        assert!(matches!(store.load_source(), LoadSource::Seeded { .. }));
        assert!(store.subject(ANCHOR_SUBJECT).is_some());
        let persisted = store.backend().get(STORAGE_KEY).expect("seed persisted");
        assert!(persisted.starts_with('{'));
    }

    #[test]
    fn numeric_ids_are_reported_and_seed_the_clock() {
        let raw = json!({
            "Toán": { "6": [{ "topic": "T", "lessons": [
                { "id": 1900000000000u64, "title": "a", "yccd": [], "mappings": {} },
                { "id": "x", "title": "b", "yccd": [], "mappings": {} },
                { "id": "x", "title": "c", "yccd": [], "mappings": {} }
            ]}]}
        });
        let mut store = CurriculumStore::open(MemoryBlobStore::with_blob(STORAGE_KEY, &raw.to_string()));
        assert!(matches!(store.load_source(), LoadSource::Stored));
        assert_eq!(store.ingest_report().normalized_ids, 1);
        assert_eq!(store.ingest_report().duplicate_ids, vec!["x".to_string()]);
        let id = store.next_id();
        assert!(id.numeric().expect("numeric") > 1900000000000);
    }

    #[test]
    fn every_write_is_persisted() {
        let mut store = CurriculumStore::open(MemoryBlobStore::default());
        let id = store.add_lesson("Toán", Grade::Eight, &defaults()).expect("add");
        let blob = store.backend().get(STORAGE_KEY).expect("blob").to_string();
        assert!(blob.contains(id.as_str()));
        assert!(!store.delete_lesson("Toán", Grade::Eight, "missing").expect("noop"));
        assert!(store.delete_lesson("Toán", Grade::Eight, id.as_str()).expect("delete"));
        let blob = store.backend().get(STORAGE_KEY).expect("blob");
        assert!(!blob.contains(id.as_str()));
    }

    #[test]
    fn reset_without_default_changes_nothing() {
        let mut store = CurriculumStore::open(MemoryBlobStore::default());
        store.add_topic("Toán", Grade::Six).expect("topic");
        let before = store.backend().get(STORAGE_KEY).expect("blob").to_string();
        let outcome = store.reset_subject("Toán", true).expect("reset");
        assert_eq!(outcome, ResetOutcome::NoDefault);
        assert_eq!(store.backend().get(STORAGE_KEY), Some(before.as_str()));
    }

    #[test]
    fn reset_requires_confirmation() {
        let mut store = CurriculumStore::open(MemoryBlobStore::default());
        store.add_topic(ANCHOR_SUBJECT, Grade::Six).expect("topic");
        let count = store.topics(ANCHOR_SUBJECT, Grade::Six).len();
        assert_eq!(
            store.reset_subject(ANCHOR_SUBJECT, false).expect("reset"),
            ResetOutcome::NeedsConfirmation
        );
        assert_eq!(store.topics(ANCHOR_SUBJECT, Grade::Six).len(), count);
        assert_eq!(
            store.reset_subject(ANCHOR_SUBJECT, true).expect("reset"),
            ResetOutcome::Reset
        );
        assert_eq!(store.topics(ANCHOR_SUBJECT, Grade::Six).len(), count - 1);
    }

    #[test]
    fn importing_a_subject_under_another_name_reissues_clashing_ids() {
        let mut store = CurriculumStore::open(MemoryBlobStore::default());
        let copy = store.subject(ANCHOR_SUBJECT).cloned().expect("seed");
        let total = copy.values().flatten().map(|t| t.lessons.len()).sum::<usize>();
        let reissued = store.replace_subject("Toán", copy).expect("replace");
        assert_eq!(reissued.len(), total);

        let (_, report) = ingest(serde_json::to_value(store.data()).expect("to json")).expect("ingest");
        assert!(report.duplicate_ids.is_empty());
        assert_eq!(report.lessons, total * 2);

        let again = store.subject("Toán").cloned().expect("copy");
        assert!(store.replace_subject("Toán", again).expect("replace").is_empty());
    }

    #[test]
    fn oversized_periods_are_clamped_on_ingest() {
        let raw = json!({
            "Toán": { "6": [{ "topic": "T", "lessons": [
                { "id": "1", "title": "a", "periods": 4294967295u64 },
                { "id": "2", "title": "b", "periods": 3 }
            ]}]}
        });
        let (data, report) = ingest(raw).expect("ingest");
        assert_eq!(report.clamped_periods, 1);
        let lessons = &data["Toán"][&Grade::Six][0].lessons;
        assert_eq!(lessons[0].periods, Some(MAX_LESSON_PERIODS));
        assert_eq!(lessons[1].periods, Some(3));
    }

    #[test]
    fn clock_survives_the_largest_stored_id() {
        let mut clock = IdClock { last: i64::MAX };
        let id = clock.next_id().numeric().expect("numeric");
        assert!(id > 0);
        assert_eq!(clock.last, i64::MAX);
    }

    #[test]
    fn ids_strictly_increase() {
        let mut store = CurriculumStore::open(MemoryBlobStore::default());
        let a = store.next_id().numeric().expect("a");
        let b = store.next_id().numeric().expect("b");
        assert!(b > a);
    }
}
