//! Rule-based cue scoring across all three dimensions.
//!
//! Each dimension has a table of per-label regex cues; weighted cue hits
//! are counted and the winning label's anchor score becomes the
//! candidate. Negation and intensity handling happen here, before
//! fusion: a negated sentiment cue votes for the mirrored label, a
//! negated difficulty or course cue is discarded, and intensity
//! modifiers scale sentiment cue weight. Domain cues (elite schools,
//! academic praise, stress and success phrases) are folded in as
//! higher-weighted entries in the same tables.

use async_trait::async_trait;
use regex::Regex;

use admit_core::{Dimension, LabelCandidate, LabelMethod, LabelMethodId, Result};

use crate::lexicon::NEGATORS;

const STRONG_MODIFIERS: &[&str] = &["very", "extremely", "absolutely"];
const WEAK_MODIFIERS: &[&str] = &["slightly", "somewhat", "bit"];

/// Weight of the domain cues relative to the base tables
const DOMAIN_CUE_WEIGHT: f64 = 2.0;

// ============================================================================
// Cue tables
// ============================================================================

const DIFFICULTY_CUES: &[(&str, &[&str])] = &[
    (
        "极难",
        &[
            r"impossible",
            r"extremely hard",
            r"nearly impossible",
            r"extremely competitive",
            r"rejection rate.*9[0-9]%",
            r"acceptance rate.*[0-5]%",
            r"top 1%",
            r"elite",
            r"most competitive",
            r"ivy league",
            r"harvard",
            r"mit",
            r"stanford",
            r"princeton",
            r"yale",
            r"dream school",
            r"reach school",
            r"super competitive",
            r"got rejected.*high gpa",
            r"perfect.*still rejected",
        ],
    ),
    (
        "难",
        &[
            r"very hard",
            r"difficult",
            r"competitive",
            r"challenging",
            r"tough",
            r"rejection rate.*[7-8][0-9]%",
            r"acceptance rate.*[1-2][0-9]%",
            r"top 10%",
            r"highly selective",
            r"selective",
            r"berkeley",
            r"ucla",
            r"michigan",
            r"carnegie mellon",
            r"hard to get in",
            r"very competitive",
            r"need high gpa",
            r"requires.*research",
            r"need.*experience",
        ],
    ),
    (
        "中等",
        &[
            r"moderate",
            r"average",
            r"reasonable",
            r"manageable",
            r"decent chance",
            r"acceptance rate.*[3-6][0-9]%",
            r"middle tier",
            r"target school",
            r"good chance",
            r"reasonable expectations",
            r"match school",
            r"state school",
            r"public university",
        ],
    ),
    (
        "易",
        &[
            r"easy",
            r"simple",
            r"not hard",
            r"accessible",
            r"easy to get in",
            r"acceptance rate.*[7-9][0-9]%",
            r"safety school",
            r"backup",
            r"guaranteed admission",
            r"open admission",
            r"community college",
            r"sure thing",
            r"easy acceptance",
        ],
    ),
];

const COURSE_CUES: &[(&str, &[&str])] = &[
    (
        "优秀",
        &[
            r"excellent",
            r"outstanding",
            r"amazing",
            r"fantastic",
            r"best.*program",
            r"top.*course",
            r"highly recommend",
        ],
    ),
    (
        "良好",
        &[r"good", r"solid", r"decent", r"satisfactory", r"recommend", r"worth it"],
    ),
    (
        "一般",
        &[r"okay", r"average", r"mediocre", r"so-so", r"not bad", r"could be better"],
    ),
    (
        "差",
        &[
            r"bad",
            r"terrible",
            r"awful",
            r"disappointing",
            r"waste of time",
            r"not recommend",
            r"avoid",
        ],
    ),
];

const SENTIMENT_CUES: &[(&str, &[&str])] = &[
    (
        "积极",
        &[
            r"excited",
            r"happy",
            r"thrilled",
            r"grateful",
            r"love",
            r"amazing",
            r"wonderful",
            r"perfect",
        ],
    ),
    (
        "消极",
        &[
            r"disappointed",
            r"frustrated",
            r"worried",
            r"stressed",
            r"hate",
            r"terrible",
            r"awful",
            r"regret",
        ],
    ),
    ("中性", &[r"neutral", r"objective", r"factual", r"information"]),
];

/// Elite-school mentions push difficulty toward the hardest label
const ELITE_SCHOOL_CUES: &[&str] =
    &[r"harvard", r"mit", r"stanford", r"princeton", r"yale", r"caltech"];

/// Praise phrases push course evaluation up
const ACADEMIC_PRAISE_CUES: &[&str] = &[
    r"excellent program",
    r"outstanding",
    r"top-tier",
    r"world-class",
    r"prestigious",
];

/// Stress indicators push sentiment down
const STRESS_CUES: &[&str] = &[
    r"stressful",
    r"overwhelming",
    r"burned out",
    r"exhausted",
    r"pressure",
];

/// Success phrases push sentiment up
const SUCCESS_CUES: &[&str] = &[
    r"got accepted",
    r"admitted",
    r"got in",
    r"accepted to",
    r"dream school",
];

// ============================================================================
// Scorer
// ============================================================================

struct Cue {
    regex: Regex,
    label: &'static str,
    weight: f64,
}

/// Pattern labeling method; votes on all three dimensions
pub struct CueScorer {
    cues: Vec<(Dimension, Vec<Cue>)>,
}

impl CueScorer {
    pub fn new() -> Self {
        let mut difficulty = Vec::new();
        build_cues(DIFFICULTY_CUES, 1.0, &mut difficulty);
        build_domain_cues(ELITE_SCHOOL_CUES, "极难", &mut difficulty);

        let mut course = Vec::new();
        build_cues(COURSE_CUES, 1.0, &mut course);
        build_domain_cues(ACADEMIC_PRAISE_CUES, "优秀", &mut course);

        let mut sentiment = Vec::new();
        build_cues(SENTIMENT_CUES, 1.0, &mut sentiment);
        build_domain_cues(STRESS_CUES, "消极", &mut sentiment);
        build_domain_cues(SUCCESS_CUES, "积极", &mut sentiment);

        Self {
            cues: vec![
                (Dimension::Difficulty, difficulty),
                (Dimension::CourseEvaluation, course),
                (Dimension::Sentiment, sentiment),
            ],
        }
    }

    fn dimension_candidate(
        &self,
        dimension: Dimension,
        cues: &[Cue],
        text: &str,
    ) -> Option<LabelCandidate> {
        let mut weights: Vec<(&'static str, f64)> = dimension
            .scale()
            .iter()
            .map(|anchor| (anchor.label, 0.0))
            .collect();

        for cue in cues {
            for hit in cue.regex.find_iter(text) {
                let window = preceding_window(text, hit.start());
                let negated = is_negated(window);
                let mut weight = cue.weight;
                let mut label = cue.label;

                if dimension == Dimension::Sentiment {
                    weight *= intensity(window);
                    if negated {
                        label = mirror_label(dimension, label);
                    }
                } else if negated {
                    // A negated cue is not evidence for its label, and
                    // the difficulty/course scales have no meaningful
                    // opposite to credit
                    continue;
                }

                if let Some(slot) = weights.iter_mut().find(|(l, _)| *l == label) {
                    slot.1 += weight;
                }
            }
        }

        // Scale order breaks ties toward the stronger label
        let mut winner = None;
        let mut best = 0.0;
        for (label, weight) in &weights {
            if *weight > best {
                best = *weight;
                winner = Some(*label);
            }
        }

        let label = winner?;
        let score = dimension.anchor_score(label)?;
        Some(LabelCandidate::new(
            LabelMethodId::Pattern,
            dimension,
            label,
            score,
        ))
    }
}

impl Default for CueScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabelMethod for CueScorer {
    fn id(&self) -> LabelMethodId {
        LabelMethodId::Pattern
    }

    fn dimensions(&self) -> &'static [Dimension] {
        &Dimension::ALL
    }

    async fn score(&self, text: &str) -> Result<Vec<LabelCandidate>> {
        let lowered = text.to_lowercase();
        let mut candidates = Vec::new();

        for (dimension, cues) in &self.cues {
            if let Some(candidate) = self.dimension_candidate(*dimension, cues, &lowered) {
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }
}

// ============================================================================
// Cue construction and match context
// ============================================================================

fn build_cues(
    table: &'static [(&'static str, &'static [&'static str])],
    weight: f64,
    out: &mut Vec<Cue>,
) {
    for (label, patterns) in table {
        for pattern in *patterns {
            if let Ok(regex) = Regex::new(&bounded(pattern)) {
                out.push(Cue {
                    regex,
                    label,
                    weight,
                });
            }
        }
    }
}

fn build_domain_cues(patterns: &'static [&'static str], label: &'static str, out: &mut Vec<Cue>) {
    for pattern in patterns {
        if let Ok(regex) = Regex::new(&bounded(pattern)) {
            out.push(Cue {
                regex,
                label,
                weight: DOMAIN_CUE_WEIGHT,
            });
        }
    }
}

/// Anchor a cue with word boundaries where its edges are word
/// characters, so `mit` stops matching inside `admitted`
fn bounded(pattern: &str) -> String {
    let mut bounded = String::new();
    if pattern
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
    {
        bounded.push_str(r"\b");
    }
    bounded.push_str(pattern);
    if pattern
        .chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphanumeric())
    {
        bounded.push_str(r"\b");
    }
    bounded
}

/// Up to 32 bytes of text before a match, for negation and intensity
/// checks
fn preceding_window(text: &str, start: usize) -> &str {
    let mut from = start.saturating_sub(32);
    while from < start && !text.is_char_boundary(from) {
        from += 1;
    }
    &text[from..start]
}

fn is_negated(window: &str) -> bool {
    window
        .split_whitespace()
        .rev()
        .take(3)
        .any(|token| NEGATORS.contains(&trim_token(token)))
}

fn intensity(window: &str) -> f64 {
    for token in window.split_whitespace().rev().take(3) {
        let token = trim_token(token);
        if STRONG_MODIFIERS.contains(&token) {
            return 1.5;
        }
        if WEAK_MODIFIERS.contains(&token) {
            return 0.5;
        }
    }
    1.0
}

fn trim_token(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
}

fn mirror_label(dimension: Dimension, label: &str) -> &'static str {
    let scale = dimension.scale();
    let position = scale
        .iter()
        .position(|anchor| anchor.label == label)
        .unwrap_or(0);
    scale[scale.len() - 1 - position].label
}

// ============================================================================
// Tests
// ============================================================================
