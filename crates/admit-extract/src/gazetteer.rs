//! Curated entity tables and the keyword extraction method.
//!
//! The built-in tables cover the universities, majors, and degree programs
//! that dominate application posts; config entries extend them at startup.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use admit_core::{
    EntityCandidate, EntityKind, ExtractMethodId, ExtractionMethod, GazetteerConfig,
    GazetteerEntry, Result,
};

/// Confidence assigned to a gazetteer hit. High: hits are precise but narrow.
pub const KEYWORD_CONFIDENCE: f64 = 0.9;

// ============================================================================
// Built-in tables
// ============================================================================

const UNIVERSITIES: &[(&str, &[&str])] = &[
    // US universities
    ("MIT", &["Massachusetts Institute of Technology", "MIT", "mit"]),
    ("Stanford", &["Stanford University", "Stanford", "stanford"]),
    ("Harvard", &["Harvard University", "Harvard", "harvard"]),
    ("CMU", &["Carnegie Mellon University", "CMU", "Carnegie Mellon", "carnegie mellon"]),
    ("UC Berkeley", &["University of California Berkeley", "UC Berkeley", "Berkeley", "UCB"]),
    ("Caltech", &["California Institute of Technology", "Caltech", "caltech"]),
    ("Princeton", &["Princeton University", "Princeton", "princeton"]),
    ("Yale", &["Yale University", "Yale", "yale"]),
    ("Columbia", &["Columbia University", "Columbia", "columbia"]),
    ("UChicago", &["University of Chicago", "UChicago", "Chicago", "uchicago"]),
    ("Cornell", &["Cornell University", "Cornell", "cornell"]),
    ("UPenn", &["University of Pennsylvania", "UPenn", "Penn", "upenn"]),
    ("Northwestern", &["Northwestern University", "Northwestern", "northwestern"]),
    ("Duke", &["Duke University", "Duke", "duke"]),
    ("Johns Hopkins", &["Johns Hopkins University", "Johns Hopkins", "JHU", "johns hopkins"]),
    ("UCLA", &["University of California Los Angeles", "UCLA", "ucla"]),
    ("UCSD", &["University of California San Diego", "UCSD", "ucsd"]),
    ("NYU", &["New York University", "NYU", "nyu"]),
    ("Georgia Tech", &["Georgia Institute of Technology", "Georgia Tech", "GT", "gatech"]),
    ("UIUC", &["University of Illinois Urbana-Champaign", "UIUC", "Illinois", "uiuc"]),
    ("UT Austin", &["University of Texas at Austin", "UT Austin", "Texas", "ut austin"]),
    ("University of Washington", &["University of Washington", "UW", "Washington", "uw"]),
    ("Rice", &["Rice University", "Rice", "rice"]),
    ("Vanderbilt", &["Vanderbilt University", "Vanderbilt", "vanderbilt"]),
    ("Brown", &["Brown University", "Brown", "brown"]),
    ("Dartmouth", &["Dartmouth College", "Dartmouth", "dartmouth"]),
    // International universities
    ("Oxford", &["University of Oxford", "Oxford", "oxford"]),
    ("Cambridge", &["University of Cambridge", "Cambridge", "cambridge"]),
    ("Imperial College", &["Imperial College London", "Imperial", "imperial"]),
    ("ETH Zurich", &["ETH Zurich", "ETH", "eth zurich"]),
    ("University of Toronto", &["University of Toronto", "UofT", "Toronto", "uoft"]),
    ("McGill", &["McGill University", "McGill", "mcgill"]),
    ("NUS", &["National University of Singapore", "NUS", "nus"]),
    ("NTU", &["Nanyang Technological University", "NTU", "ntu"]),
    ("University of Melbourne", &["University of Melbourne", "Melbourne", "unimelb"]),
    ("ANU", &["Australian National University", "ANU", "anu"]),
];

const MAJORS: &[(&str, &[&str])] = &[
    ("Computer Science", &["Computer Science", "CS", "computer science", "computing"]),
    ("Electrical Engineering", &["Electrical Engineering", "EE", "electrical engineering", "ECE"]),
    ("Mechanical Engineering", &["Mechanical Engineering", "ME", "mechanical engineering"]),
    ("Civil Engineering", &["Civil Engineering", "CE", "civil engineering"]),
    ("Chemical Engineering", &["Chemical Engineering", "ChemE", "chemical engineering"]),
    ("Biomedical Engineering", &["Biomedical Engineering", "BME", "biomedical engineering"]),
    ("Mathematics", &["Mathematics", "Math", "mathematics", "Applied Mathematics"]),
    ("Physics", &["Physics", "physics", "Applied Physics"]),
    ("Chemistry", &["Chemistry", "chemistry", "Biochemistry"]),
    ("Biology", &["Biology", "biology", "Molecular Biology", "Cell Biology"]),
    ("Medicine", &["Medicine", "medicine", "Medical", "MD"]),
    ("Business", &["Business", "business", "Business Administration"]),
    ("MBA", &["MBA", "Master of Business Administration", "mba"]),
    ("Economics", &["Economics", "economics", "Econ"]),
    ("Finance", &["Finance", "finance", "Financial Engineering"]),
    ("Psychology", &["Psychology", "psychology", "Psych"]),
    ("Political Science", &["Political Science", "politics", "government"]),
    ("International Relations", &["International Relations", "IR", "international relations"]),
    ("Data Science", &["Data Science", "data science", "Data Analytics"]),
    ("Machine Learning", &["Machine Learning", "ML", "machine learning", "AI"]),
    ("Artificial Intelligence", &["Artificial Intelligence", "AI", "artificial intelligence"]),
    ("Cybersecurity", &["Cybersecurity", "cybersecurity", "Information Security"]),
    ("Software Engineering", &["Software Engineering", "software engineering", "SWE"]),
];

const PROGRAMS: &[(&str, &[&str])] = &[
    ("PhD", &["PhD", "Ph.D.", "Doctor of Philosophy", "Doctorate", "doctoral"]),
    ("Master", &["Master", "Masters", "MS", "MA", "MEng", "MSc"]),
    ("Bachelor", &["Bachelor", "Bachelors", "BS", "BA", "BSc", "undergraduate"]),
    ("MBA", &["MBA", "Master of Business Administration"]),
    ("JD", &["JD", "Juris Doctor", "Law School"]),
    ("MD", &["MD", "Doctor of Medicine", "Medical School"]),
    ("Postdoc", &["Postdoc", "Post-doctoral", "Postdoctoral"]),
    ("Certificate", &["Certificate", "certification", "cert"]),
];

// ============================================================================
// Gazetteer
// ============================================================================

/// Canonical entity names with their surface variants, plus a reverse
/// lookup from lowercased variant to canonical name.
///
/// When two entries claim the same variant, the later entry wins the
/// lookup; config extensions are applied last and so override the
/// built-in tables.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    entries: HashMap<EntityKind, Vec<GazetteerEntry>>,
    lookups: HashMap<EntityKind, HashMap<String, String>>,
}

impl Gazetteer {
    /// Build the gazetteer from the built-in tables only
    pub fn builtin() -> Self {
        let mut gazetteer = Self {
            entries: HashMap::new(),
            lookups: HashMap::new(),
        };

        for (canonical, variants) in UNIVERSITIES {
            gazetteer.add(EntityKind::University, canonical, variants);
        }
        for (canonical, variants) in MAJORS {
            gazetteer.add(EntityKind::Major, canonical, variants);
        }
        for (canonical, variants) in PROGRAMS {
            gazetteer.add(EntityKind::Program, canonical, variants);
        }

        gazetteer
    }

    /// Build the gazetteer from the built-in tables plus config extensions
    pub fn from_config(config: &GazetteerConfig) -> Self {
        let mut gazetteer = Self::builtin();
        gazetteer.extend(config);
        gazetteer
    }

    /// Merge config entries over the current tables
    pub fn extend(&mut self, config: &GazetteerConfig) {
        for entry in &config.universities {
            let variants: Vec<&str> = entry.variants.iter().map(|v| v.as_str()).collect();
            self.add(EntityKind::University, &entry.canonical, &variants);
        }
        for entry in &config.majors {
            let variants: Vec<&str> = entry.variants.iter().map(|v| v.as_str()).collect();
            self.add(EntityKind::Major, &entry.canonical, &variants);
        }
        for entry in &config.programs {
            let variants: Vec<&str> = entry.variants.iter().map(|v| v.as_str()).collect();
            self.add(EntityKind::Program, &entry.canonical, &variants);
        }
    }

    fn add(&mut self, kind: EntityKind, canonical: &str, variants: &[&str]) {
        let lookup = self.lookups.entry(kind).or_default();
        lookup.insert(canonical.to_lowercase(), canonical.to_string());
        for variant in variants {
            lookup.insert(variant.to_lowercase(), canonical.to_string());
        }

        self.entries.entry(kind).or_default().push(GazetteerEntry {
            canonical: canonical.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        });
    }

    /// Resolve a raw span to its canonical name, if known
    pub fn canonicalize(&self, kind: EntityKind, raw: &str) -> Option<&str> {
        self.lookups
            .get(&kind)?
            .get(&raw.trim().to_lowercase())
            .map(|s| s.as_str())
    }

    /// All entries for a kind
    pub fn entries(&self, kind: EntityKind) -> &[GazetteerEntry] {
        self.entries.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Canonical names for a kind, in table order
    pub fn canonicals(&self, kind: EntityKind) -> Vec<&str> {
        self.entries(kind)
            .iter()
            .map(|e| e.canonical.as_str())
            .collect()
    }
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Keyword method
// ============================================================================

/// Gazetteer scan over the cleaned text.
///
/// Variants match at word boundaries. Short all-caps variants ("CS", "ME",
/// "BA") match case-sensitively so that ordinary words never resolve to an
/// entity; every other variant matches case-insensitively.
pub struct KeywordMatcher {
    gazetteer: Arc<Gazetteer>,
    scanners: Vec<(EntityKind, Regex)>,
}

impl KeywordMatcher {
    pub fn new(gazetteer: Arc<Gazetteer>) -> Self {
        let mut scanners = Vec::new();

        for kind in EntityKind::ALL {
            let mut exact = Vec::new();
            let mut folded = Vec::new();
            for entry in gazetteer.entries(kind) {
                for variant in std::iter::once(&entry.canonical).chain(entry.variants.iter()) {
                    if is_acronym(variant) {
                        exact.push(variant.as_str());
                    } else {
                        folded.push(variant.as_str());
                    }
                }
            }

            if let Some(regex) = build_scanner(&folded, false) {
                scanners.push((kind, regex));
            }
            if let Some(regex) = build_scanner(&exact, true) {
                scanners.push((kind, regex));
            }
        }

        Self { gazetteer, scanners }
    }
}

/// Short all-caps variants are ambiguous with ordinary words when folded
fn is_acronym(variant: &str) -> bool {
    variant.len() <= 5 && !variant.is_empty() && variant.chars().all(|c| c.is_ascii_uppercase())
}

/// Compile one alternation over `variants`, longest first so the longest
/// surface form wins at a shared start position.
fn build_scanner(variants: &[&str], case_sensitive: bool) -> Option<Regex> {
    if variants.is_empty() {
        return None;
    }

    let mut sorted: Vec<&str> = variants.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    sorted.dedup();

    let alternation: Vec<String> = sorted.iter().map(|v| bounded(v)).collect();
    let pattern = if case_sensitive {
        format!("(?:{})", alternation.join("|"))
    } else {
        format!("(?i)(?:{})", alternation.join("|"))
    };

    Regex::new(&pattern).ok()
}

/// Escape a variant and anchor it at word boundaries where its edges are
/// word characters ("\b" after "Ph.D." would never match).
fn bounded(variant: &str) -> String {
    let escaped = regex::escape(variant);
    let mut pattern = String::new();
    if variant.chars().next().is_some_and(|c| c.is_alphanumeric()) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&escaped);
    if variant.chars().last().is_some_and(|c| c.is_alphanumeric()) {
        pattern.push_str(r"\b");
    }
    pattern
}

#[async_trait]
impl ExtractionMethod for KeywordMatcher {
    fn id(&self) -> ExtractMethodId {
        ExtractMethodId::Keyword
    }

    async fn candidates(&self, text: &str) -> Result<Vec<EntityCandidate>> {
        let mut candidates = Vec::new();
        let mut seen: HashSet<(EntityKind, String)> = HashSet::new();

        for (kind, regex) in &self.scanners {
            for mat in regex.find_iter(text) {
                let Some(canonical) = self.gazetteer.canonicalize(*kind, mat.as_str()) else {
                    continue;
                };
                if seen.insert((*kind, canonical.to_lowercase())) {
                    candidates.push(EntityCandidate::new(
                        ExtractMethodId::Keyword,
                        *kind,
                        mat.as_str(),
                        canonical,
                        KEYWORD_CONFIDENCE,
                    ));
                }
            }
        }

        Ok(candidates)
    }
}

// ============================================================================
// Tests
// ============================================================================
