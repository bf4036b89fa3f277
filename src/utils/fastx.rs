use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use crate::config::defs::{PipelineError, FASTQ_EXTS, GZIP_EXT};
use crate::utils::file::list_file_names;

/// Mate-1 suffixes of the sequencing platforms we accept. No entry is a suffix
/// of another, so a filename matches at most one of them.
pub const R1_SUFFIXES: &[&str] = &[
    "_1.fastq", "_1.fastq.gz",
    "_1.fq.gz", "_1.fq",
    "_R1.fq.gz", "_R1.fq",
    "_R1.fastq.gz", "_R1.fastq",
    "_R1_001.fq.gz", "_R1_001.fq",
    "_R1_001.fastq.gz", "_R1_001.fastq",
];

lazy_static! {
    static ref LANE_RE: Regex = Regex::new(r"L00[1-4]").unwrap();
}

const SAMPLE_TRIM_CHARS: &[char] = &['_', '-', '.'];


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mate {
    R1,
    R2,
}

/// How paired files are named in one input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConvention {
    pub r1_suffix: String,
    pub r2_suffix: String,
}

impl NamingConvention {
    /// Builds the convention for a known mate-1 suffix.
    pub fn from_r1_suffix(r1_suffix: &str) -> Result<Self, PipelineError> {
        if !R1_SUFFIXES.contains(&r1_suffix) {
            return Err(PipelineError::InvalidConfig(format!(
                "Unknown mate-1 suffix '{}'. Expected one of {:?}",
                r1_suffix, R1_SUFFIXES
            )));
        }
        Ok(NamingConvention {
            r1_suffix: r1_suffix.to_string(),
            r2_suffix: r1_suffix.replacen('1', "2", 1),
        })
    }

    pub fn is_gzipped(&self) -> bool {
        self.r1_suffix.ends_with(GZIP_EXT)
    }

    pub fn mate_of(&self, file_name: &str) -> Option<Mate> {
        if file_name.ends_with(&self.r1_suffix) {
            Some(Mate::R1)
        } else if file_name.ends_with(&self.r2_suffix) {
            Some(Mate::R2)
        } else {
            None
        }
    }

    pub fn suffix(&self, mate: Mate) -> &str {
        match mate {
            Mate::R1 => &self.r1_suffix,
            Mate::R2 => &self.r2_suffix,
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    pub sample_name: String,
    pub lane: Option<String>,
}

/// Splits a filename into sample name and optional lane token.
///
/// # Arguments
///
/// * `file_name` - Raw file name, expected to end in `suffix`.
/// * `suffix` - Mate suffix the name ends with.
///
/// # Returns
/// ParsedFilename. Sample is the text before the first `L00[1-4]` token with trailing
/// separators trimmed, or the whole stem when there is no lane token.
pub fn parse_filename(file_name: &str, suffix: &str) -> ParsedFilename {
    let stem = file_name.strip_suffix(suffix).unwrap_or(file_name);

    match LANE_RE.find(stem) {
        Some(m) => ParsedFilename {
            sample_name: stem[..m.start()].trim_end_matches(SAMPLE_TRIM_CHARS).to_string(),
            lane: Some(m.as_str().to_string()),
        },
        None => ParsedFilename {
            sample_name: stem.to_string(),
            lane: None,
        },
    }
}

/// Returns the known mate-1 suffix a filename ends with, if any.
fn known_r1_suffix(file_name: &str) -> Option<&'static str> {
    R1_SUFFIXES.iter().copied().find(|s| file_name.ends_with(s))
}

/// Determines the paired-end naming convention from a set of filenames.
///
/// # Arguments
///
/// * `dir` - Directory the names came from, for error reporting.
/// * `file_names` - Every filename in the directory.
///
/// # Returns
/// NamingConvention, or UnrecognizedFormat / AmbiguousFormat.
pub fn detect_from_names<S: AsRef<str>>(dir: &Path, file_names: &[S]) -> Result<NamingConvention, PipelineError> {
    let found: BTreeSet<&'static str> = file_names
        .iter()
        .filter_map(|f| known_r1_suffix(f.as_ref()))
        .collect();

    let mut found_iter = found.iter();
    match (found_iter.next(), found_iter.next()) {
        (None, _) => Err(PipelineError::UnrecognizedFormat(dir.to_path_buf())),
        (Some(suffix), None) => NamingConvention::from_r1_suffix(suffix),
        _ => Err(PipelineError::AmbiguousFormat {
            dir: dir.to_path_buf(),
            suffixes: found.iter().map(|s| s.to_string()).collect(),
        }),
    }
}

/// Scans a directory and determines which paired-end naming convention is in use.
pub fn detect_naming_convention(dir: &Path) -> Result<NamingConvention, PipelineError> {
    let file_names = list_file_names(dir)?;
    let convention = detect_from_names(dir, &file_names)?;
    debug!("Detected mate suffixes {} / {} in {}", convention.r1_suffix, convention.r2_suffix, dir.display());
    Ok(convention)
}


#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SampleFile {
    pub file_name: String,
    pub mate: Mate,
    pub lane: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneMode {
    Single,
    Multi,
}

/// One mate pair of a sample, processed by the lane stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanePair {
    pub label: String,
    pub lane: Option<String>,
    pub r1: String,
    pub r2: String,
}

/// All files of one sample, both mates and all lanes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGroup {
    pub sample_name: String,
    pub files: BTreeSet<SampleFile>,
}

impl SampleGroup {
    /// Size 2 is one mate pair, any larger even size is several lanes to be merged.
    pub fn lane_mode(&self) -> Result<LaneMode, PipelineError> {
        match self.files.len() {
            2 => Ok(LaneMode::Single),
            n if n >= 4 && n % 2 == 0 => Ok(LaneMode::Multi),
            n => Err(PipelineError::UnbalancedPair {
                sample: self.sample_name.clone(),
                count: n,
            }),
        }
    }

    /// Pairs the group's files by lane, sorted by lane.
    ///
    /// # Returns
    /// Vec<LanePair>. Single-lane groups get the sample name as label, multi-lane
    /// groups `<sample>_<lane>`.
    pub fn lane_pairs(&self) -> Result<Vec<LanePair>, PipelineError> {
        let mode = self.lane_mode()?;
        let unbalanced = || PipelineError::UnbalancedPair {
            sample: self.sample_name.clone(),
            count: self.files.len(),
        };

        let mut lanes: BTreeMap<Option<&str>, (Option<&str>, Option<&str>)> = BTreeMap::new();
        for file in &self.files {
            let entry = lanes.entry(file.lane.as_deref()).or_default();
            let slot = match file.mate {
                Mate::R1 => &mut entry.0,
                Mate::R2 => &mut entry.1,
            };
            if slot.is_some() {
                return Err(unbalanced());
            }
            *slot = Some(file.file_name.as_str());
        }

        if mode == LaneMode::Multi && lanes.contains_key(&None) {
            return Err(PipelineError::MixedLaneLayout {
                sample: self.sample_name.clone(),
            });
        }

        lanes
            .into_iter()
            .map(|(lane, mates)| match mates {
                (Some(r1), Some(r2)) => {
                    let label = match (mode, lane) {
                        (LaneMode::Multi, Some(lane)) => format!("{}_{}", self.sample_name, lane),
                        _ => self.sample_name.clone(),
                    };
                    Ok(LanePair {
                        label,
                        lane: lane.map(str::to_string),
                        r1: r1.to_string(),
                        r2: r2.to_string(),
                    })
                }
                _ => Err(unbalanced()),
            })
            .collect()
    }
}

/// Partitions filenames into per-sample groups and validates group sizes.
///
/// # Arguments
///
/// * `file_names` - Directory listing.
/// * `convention` - Naming convention detected for the directory.
///
/// # Returns
/// Groups keyed by sample name. Files matching neither mate suffix are skipped with a warning.
pub fn group_samples<S: AsRef<str>>(
    file_names: &[S],
    convention: &NamingConvention,
) -> Result<BTreeMap<String, SampleGroup>, PipelineError> {
    let mut groups: BTreeMap<String, SampleGroup> = BTreeMap::new();
    let mut excluded = Vec::new();

    for file_name in file_names.iter().map(AsRef::as_ref) {
        let mate = match convention.mate_of(file_name) {
            Some(mate) => mate,
            None => {
                excluded.push(file_name);
                continue;
            }
        };
        let parsed = parse_filename(file_name, convention.suffix(mate));
        if parsed.sample_name.is_empty() {
            return Err(PipelineError::EmptySampleName {
                file: file_name.to_string(),
            });
        }
        groups
            .entry(parsed.sample_name.clone())
            .or_insert_with(|| SampleGroup {
                sample_name: parsed.sample_name,
                files: BTreeSet::new(),
            })
            .files
            .insert(SampleFile {
                file_name: file_name.to_string(),
                mate,
                lane: parsed.lane,
            });
    }

    if !excluded.is_empty() {
        warn!(
            "Ignoring {} file(s) not ending in {} or {}: {:?}",
            excluded.len(),
            convention.r1_suffix,
            convention.r2_suffix,
            excluded
        );
    }

    for group in groups.values() {
        group.lane_mode()?;
    }

    Ok(groups)
}

/// Trim Galore output name for a raw read file: stem without the FASTQ extension
/// followed by the validated-pair suffix.
pub fn trimmed_name(file_name: &str, val_suffix: &str) -> String {
    let stem = FASTQ_EXTS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name);
    format!("{}{}", stem, val_suffix)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn convention(r1: &str) -> NamingConvention {
        NamingConvention::from_r1_suffix(r1).unwrap()
    }

    #[test]
    fn test_every_suffix_family_detected() {
        for r1 in R1_SUFFIXES {
            let names = [format!("sample{}", r1)];
            let found = detect_from_names(Path::new("in"), &names).unwrap();
            assert_eq!(found.r1_suffix, *r1);
            assert_eq!(found.r2_suffix, r1.replacen('1', "2", 1));
        }
    }

    #[test]
    fn test_r2_suffix_derivation() {
        assert_eq!(convention("_R1_001.fastq.gz").r2_suffix, "_R2_001.fastq.gz");
        assert_eq!(convention("_1.fq").r2_suffix, "_2.fq");
        assert_eq!(convention("_R1.fq.gz").r2_suffix, "_R2.fq.gz");
    }

    #[test]
    fn test_unknown_suffix_override_rejected() {
        let result = NamingConvention::from_r1_suffix("_forward.fastq");
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_unrecognized_format() {
        let result = detect_from_names(Path::new("in"), &["notes.txt"]);
        assert!(matches!(result, Err(PipelineError::UnrecognizedFormat(p)) if p == PathBuf::from("in")));
    }

    #[test]
    fn test_mate2_only_is_unrecognized() {
        let result = detect_from_names(Path::new("in"), &["sample_2.fastq"]);
        assert!(matches!(result, Err(PipelineError::UnrecognizedFormat(_))));
    }

    #[test]
    fn test_ambiguous_format() {
        let names = ["a_1.fastq", "a_2.fastq", "b_R1.fq.gz", "b_R2.fq.gz"];
        match detect_from_names(Path::new("in"), &names) {
            Err(PipelineError::AmbiguousFormat { suffixes, .. }) => {
                assert_eq!(suffixes, vec!["_1.fastq".to_string(), "_R1.fq.gz".to_string()]);
            }
            other => panic!("Expected AmbiguousFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_illumina_names_are_not_ambiguous() {
        let names = ["S1_S1_L001_R1_001.fastq.gz", "S1_S1_L001_R2_001.fastq.gz"];
        let found = detect_from_names(Path::new("in"), &names).unwrap();
        assert_eq!(found.r1_suffix, "_R1_001.fastq.gz");
        assert!(found.is_gzipped());
    }

    #[test]
    fn test_parse_without_lane() {
        let parsed = parse_filename("sampleA_1.fastq.gz", "_1.fastq.gz");
        assert_eq!(parsed, ParsedFilename { sample_name: "sampleA".to_string(), lane: None });
    }

    #[test]
    fn test_parse_with_lane() {
        let parsed = parse_filename("sampleL002_1.fastq", "_1.fastq");
        assert_eq!(parsed.sample_name, "sample");
        assert_eq!(parsed.lane.as_deref(), Some("L002"));

        let parsed = parse_filename("sampleB_L001_2.fq", "_2.fq");
        assert_eq!(parsed.sample_name, "sampleB");
        assert_eq!(parsed.lane.as_deref(), Some("L001"));
    }

    #[test]
    fn test_parse_lane_out_of_range_is_sample_text() {
        let parsed = parse_filename("sample_L005_R1.fq", "_R1.fq");
        assert_eq!(parsed.sample_name, "sample_L005");
        assert_eq!(parsed.lane, None);
    }

    #[test]
    fn test_parse_first_lane_token_wins() {
        let parsed = parse_filename("runL001_L003_R1_001.fastq", "_R1_001.fastq");
        assert_eq!(parsed.sample_name, "run");
        assert_eq!(parsed.lane.as_deref(), Some("L001"));
    }

    #[test]
    fn test_single_sample_round_trip() {
        let names = ["sampleA_1.fastq.gz", "sampleA_2.fastq.gz"];
        let conv = detect_from_names(Path::new("in"), &names).unwrap();
        assert_eq!(conv, NamingConvention {
            r1_suffix: "_1.fastq.gz".to_string(),
            r2_suffix: "_2.fastq.gz".to_string(),
        });

        let groups = group_samples(&names, &conv).unwrap();
        assert_eq!(groups.len(), 1);
        let group = &groups["sampleA"];
        let files: Vec<&str> = group.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(files, vec!["sampleA_1.fastq.gz", "sampleA_2.fastq.gz"]);
        assert_eq!(group.lane_mode().unwrap(), LaneMode::Single);

        let pairs = group.lane_pairs().unwrap();
        assert_eq!(pairs, vec![LanePair {
            label: "sampleA".to_string(),
            lane: None,
            r1: "sampleA_1.fastq.gz".to_string(),
            r2: "sampleA_2.fastq.gz".to_string(),
        }]);
    }

    #[test]
    fn test_multi_lane_group() {
        let names = ["sampleB_L002_2.fq", "sampleB_L001_1.fq", "sampleB_L002_1.fq", "sampleB_L001_2.fq"];
        let groups = group_samples(&names, &convention("_1.fq")).unwrap();
        assert_eq!(groups.len(), 1);
        let group = &groups["sampleB"];
        assert_eq!(group.files.len(), 4);
        assert_eq!(group.lane_mode().unwrap(), LaneMode::Multi);

        let pairs = group.lane_pairs().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].label, "sampleB_L001");
        assert_eq!(pairs[0].r1, "sampleB_L001_1.fq");
        assert_eq!(pairs[0].r2, "sampleB_L001_2.fq");
        assert_eq!(pairs[1].label, "sampleB_L002");
        assert_eq!(pairs[1].lane.as_deref(), Some("L002"));
    }

    #[test]
    fn test_single_lane_with_lane_token_uses_sample_label() {
        let names = ["s_L003_R1.fq", "s_L003_R2.fq"];
        let groups = group_samples(&names, &convention("_R1.fq")).unwrap();
        let pairs = groups["s"].lane_pairs().unwrap();
        assert_eq!(pairs[0].label, "s");
        assert_eq!(pairs[0].lane.as_deref(), Some("L003"));
    }

    #[test]
    fn test_grouping_is_idempotent_and_order_independent() {
        let names = vec!["b_1.fq", "a_2.fq", "a_1.fq", "b_2.fq", "readme.md"];
        let conv = convention("_1.fq");
        let first = group_samples(&names, &conv).unwrap();
        let second = group_samples(&names, &conv).unwrap();
        assert_eq!(first, second);

        let mut reversed = names.clone();
        reversed.reverse();
        assert_eq!(first, group_samples(&reversed, &conv).unwrap());
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_unmatched_files_are_excluded() {
        let names = ["a_1.fq", "a_2.fq", "a_1.fastq", "summary.csv"];
        let groups = group_samples(&names, &convention("_1.fq")).unwrap();
        assert_eq!(groups["a"].files.len(), 2);
    }

    #[test]
    fn test_odd_group_is_unbalanced() {
        let names = ["c_1.fq", "c_2.fq", "c_L001_1.fq"];
        match group_samples(&names, &convention("_1.fq")) {
            Err(PipelineError::UnbalancedPair { sample, count }) => {
                assert_eq!(sample, "c");
                assert_eq!(count, 3);
            }
            other => panic!("Expected UnbalancedPair, got {:?}", other),
        }
    }

    #[test]
    fn test_lone_mate_is_unbalanced() {
        let names = ["d_1.fq"];
        assert!(matches!(
            group_samples(&names, &convention("_1.fq")),
            Err(PipelineError::UnbalancedPair { count: 1, .. })
        ));
    }

    #[test]
    fn test_group_sizes_select_mode() {
        let conv = convention("_1.fq");
        for lanes in 1..=4usize {
            let names: Vec<String> = (1..=lanes)
                .flat_map(|l| [format!("x_L00{}_1.fq", l), format!("x_L00{}_2.fq", l)])
                .collect();
            let groups = group_samples(&names, &conv).unwrap();
            let expected = if lanes == 1 { LaneMode::Single } else { LaneMode::Multi };
            assert_eq!(groups["x"].lane_mode().unwrap(), expected);
            assert_eq!(groups["x"].lane_pairs().unwrap().len(), lanes);
        }
    }

    #[test]
    fn test_same_mate_twice_is_unbalanced() {
        let names = ["e_L001_1.fq", "eL001_1.fq"];
        let groups = group_samples(&names, &convention("_1.fq")).unwrap();
        assert!(matches!(groups["e"].lane_pairs(), Err(PipelineError::UnbalancedPair { .. })));
    }

    #[test]
    fn test_mixed_lane_layout_rejected() {
        let names = ["f_1.fq", "f_2.fq", "f_L001_1.fq", "f_L001_2.fq"];
        let groups = group_samples(&names, &convention("_1.fq")).unwrap();
        assert!(matches!(groups["f"].lane_pairs(), Err(PipelineError::MixedLaneLayout { .. })));
    }

    #[test]
    fn test_empty_sample_name_rejected() {
        for names in [["_1.fq", "_2.fq"], ["L001_1.fq", "L001_2.fq"]] {
            match group_samples(&names, &convention("_1.fq")) {
                Err(PipelineError::EmptySampleName { file }) => assert!(names.contains(&file.as_str())),
                other => panic!("Expected EmptySampleName, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_detect_naming_convention_from_dir() -> Result<(), PipelineError> {
        let dir = tempfile::tempdir()?;
        std::fs::File::create(dir.path().join("x_R1_001.fq"))?;
        std::fs::File::create(dir.path().join("x_R2_001.fq"))?;
        std::fs::File::create(dir.path().join("SampleSheet.csv"))?;

        let found = detect_naming_convention(dir.path())?;
        assert_eq!(found, convention("_R1_001.fq"));
        assert!(!found.is_gzipped());
        Ok(())
    }

    #[test]
    fn test_trimmed_name() {
        assert_eq!(trimmed_name("sampleA_1.fastq.gz", "_val_1.fq.gz"), "sampleA_1_val_1.fq.gz");
        assert_eq!(trimmed_name("s_L001_R2_001.fq", "_val_2.fq.gz"), "s_L001_R2_001_val_2.fq.gz");
    }
}
