//! Slicing a remote file listing into transfer batches.
//!
//! Listing order is preserved end to end; "resume point" and "file limit"
//! are both defined in terms of it.

/// Files handed to a single copy invocation.
pub const BATCH_SIZE: usize = 100;

/// Where in the listing a resumed run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumePoint {
    /// No initial file was requested.
    Start,
    /// The first entry containing the requested name.
    Found { index: usize },
    /// Nothing matched; the run starts from the beginning.
    NotFound,
}

impl ResumePoint {
    pub fn index(&self) -> usize {
        match self {
            ResumePoint::Found { index } => *index,
            ResumePoint::Start | ResumePoint::NotFound => 0,
        }
    }
}

/// Find the first entry containing `initial_file` as a substring. An empty
/// name means no resume point.
pub fn find_resume_point(files: &[String], initial_file: Option<&str>) -> ResumePoint {
    let Some(needle) = initial_file.filter(|name| !name.is_empty()) else {
        return ResumePoint::Start;
    };
    files
        .iter()
        .position(|name| name.contains(needle))
        .map_or(ResumePoint::NotFound, |index| ResumePoint::Found { index })
}

/// The slice of a listing one task will transfer, already cut into batches.
#[derive(Debug)]
pub struct BatchPlan<'a> {
    pub resume: ResumePoint,
    pub batches: Vec<&'a [String]>,
}

impl BatchPlan<'_> {
    /// Number of files the plan transfers.
    pub fn file_count(&self) -> usize {
        self.batches.iter().map(|b| b.len()).sum()
    }
}

/// Skip to the resume point, keep at most `file_limit` files, and cut the
/// rest into consecutive batches of `batch_size`. A limit of 0 means no limit.
pub fn plan_batches<'a>(
    files: &'a [String],
    initial_file: Option<&str>,
    file_limit: Option<usize>,
    batch_size: usize,
) -> BatchPlan<'a> {
    let resume = find_resume_point(files, initial_file);
    let remaining = &files[resume.index()..];
    let to_download = match file_limit {
        Some(limit) if limit > 0 => remaining.len().min(limit),
        Some(_) | None => remaining.len(),
    };
    let batches = remaining[..to_download]
        .chunks(batch_size.max(1))
        .collect();
    BatchPlan { resume, batches }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("file_{i:04}.bin")).collect()
    }

    #[test]
    fn test_batches_cover_all_files_in_order() {
        for n in [1, 99, 100, 101, 250, 1000] {
            let files = listing(n);
            let plan = plan_batches(&files, None, None, BATCH_SIZE);
            assert_eq!(plan.batches.len(), n.div_ceil(BATCH_SIZE), "n = {n}");
            assert!(plan.batches.iter().all(|b| !b.is_empty() && b.len() <= BATCH_SIZE));
            let flattened: Vec<&String> = plan.batches.iter().flat_map(|b| b.iter()).collect();
            assert_eq!(flattened, files.iter().collect::<Vec<_>>(), "n = {n}");
        }
    }

    #[test]
    fn test_empty_listing_has_no_batches() {
        let plan = plan_batches(&[], None, None, BATCH_SIZE);
        assert!(plan.batches.is_empty());
        assert_eq!(plan.file_count(), 0);
    }

    #[test]
    fn test_resume_from_initial_file() {
        let mut files = listing(20);
        files[7] = "reports/report.csv".to_string();
        let plan = plan_batches(&files, Some("report.csv"), None, BATCH_SIZE);
        assert_eq!(plan.resume, ResumePoint::Found { index: 7 });
        assert_eq!(plan.batches.len(), 1);
        assert_eq!(plan.batches[0], &files[7..]);
    }

    #[test]
    fn test_limit_after_resume_point() {
        let mut files = listing(30);
        files[7] = "report.csv".to_string();
        let plan = plan_batches(&files, Some("report.csv"), Some(5), BATCH_SIZE);
        assert_eq!(plan.batches.len(), 1);
        assert_eq!(plan.batches[0], &files[7..12]);
        assert_eq!(plan.file_count(), 5);
    }

    #[test]
    fn test_limit_larger_than_listing() {
        let files = listing(3);
        let plan = plan_batches(&files, None, Some(50), BATCH_SIZE);
        assert_eq!(plan.file_count(), 3);
    }

    #[test]
    fn test_limit_spanning_batches() {
        let files = listing(500);
        let plan = plan_batches(&files, None, Some(250), BATCH_SIZE);
        let sizes: Vec<usize> = plan.batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, [100, 100, 50]);
    }

    #[test]
    fn test_first_match_wins() {
        let files: Vec<String> = ["a.txt", "data.csv", "more_data.csv"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            find_resume_point(&files, Some("data")),
            ResumePoint::Found { index: 1 }
        );
    }

    #[test]
    fn test_found_at_zero_distinct_from_not_found() {
        let files = listing(5);
        let found = find_resume_point(&files, Some("file_0000"));
        let missing = find_resume_point(&files, Some("nope"));
        assert_eq!(found, ResumePoint::Found { index: 0 });
        assert_eq!(missing, ResumePoint::NotFound);
        assert_eq!(found.index(), missing.index());
        assert_ne!(found, missing);
    }

    #[test]
    fn test_not_found_starts_from_beginning() {
        let files = listing(5);
        let plan = plan_batches(&files, Some("missing.doc"), None, BATCH_SIZE);
        assert_eq!(plan.resume, ResumePoint::NotFound);
        assert_eq!(plan.file_count(), 5);
    }

    #[test]
    fn test_no_initial_file() {
        assert_eq!(find_resume_point(&listing(2), None), ResumePoint::Start);
    }

    #[test]
    fn test_zero_limit_means_unlimited() {
        let files = listing(10);
        let plan = plan_batches(&files, None, Some(0), BATCH_SIZE);
        assert_eq!(plan.file_count(), 10);
        assert_eq!(plan.batches.len(), 1);
    }

    #[test]
    fn test_empty_initial_file_is_no_resume_point() {
        let files = listing(4);
        assert_eq!(find_resume_point(&files, Some("")), ResumePoint::Start);
        let plan = plan_batches(&files, Some(""), None, BATCH_SIZE);
        assert_eq!(plan.resume, ResumePoint::Start);
        assert_eq!(plan.file_count(), 4);
    }
}
