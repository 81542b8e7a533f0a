use super::config::ScoreNormalization;
use super::error::EngineError;
use crate::core::geometry::Transform;
use nalgebra::{Matrix3, Vector3};

const SNIPPET_LENGTH: usize = 400;

const ROTATION_MARKER: &str = "rotation matrix";
const SCORE_MARKER: &str = "TM-score=";
const ALIGNED_LENGTH_MARKER: &str = "Aligned length=";
const RMSD_MARKER: &str = "RMSD=";

/// The outcome of superposing one structure onto another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Superposition {
    /// Maps the mobile structure's coordinates into the target's frame.
    pub transform: Transform,
    /// Similarity score in `[0, 1]`.
    pub score: f64,
    pub rmsd: Option<f64>,
    pub aligned_length: Option<usize>,
}

fn parse_error(missing: &'static str, text: &str) -> EngineError {
    EngineError::OutputParse {
        missing,
        snippet: text.chars().take(SNIPPET_LENGTH).collect(),
    }
}

/// Reads the number following `marker` on `line`, e.g. `RMSD=   2.33,`.
fn value_after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let start = line.find(marker)? + marker.len();
    line[start..]
        .split(|c: char| c.is_whitespace() || c == ',' || c == '(')
        .find(|s| !s.is_empty())
}

fn parse_rotation(text: &str) -> Option<Transform> {
    let mut lines = text
        .lines()
        .skip_while(|line| !line.contains(ROTATION_MARKER))
        .skip(1)
        .filter(|line| !line.trim().is_empty());

    // Column header: m t[m] u[m][0] u[m][1] u[m][2]
    lines.next()?;

    let mut rotation = Matrix3::zeros();
    let mut translation = Vector3::zeros();
    for m in 0..3 {
        let values: Vec<f64> = lines
            .next()?
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .ok()?;
        let [index, t, u0, u1, u2] = values[..] else {
            return None;
        };
        if index as usize != m {
            return None;
        }
        translation[m] = t;
        rotation[(m, 0)] = u0;
        rotation[(m, 1)] = u1;
        rotation[(m, 2)] = u2;
    }
    Some(Transform::new(rotation, translation))
}

fn parse_score(text: &str, normalization: ScoreNormalization) -> Option<f64> {
    text.lines()
        .filter(|line| line.trim_start().starts_with(SCORE_MARKER))
        .find(|line| line.contains(normalization.report_label()))
        .and_then(|line| value_after(line, SCORE_MARKER))
        .and_then(|value| value.parse().ok())
}

/// Parses an engine report into a [`Superposition`].
///
/// The report must contain the rotation matrix block and a score line
/// normalized by the structure `normalization` selects. The aligned length
/// and RMSD are read when present.
///
/// # Errors
///
/// Returns [`EngineError::OutputParse`] naming the first required marker
/// that could not be read.
pub fn parse_report(
    text: &str,
    normalization: ScoreNormalization,
) -> Result<Superposition, EngineError> {
    let transform = parse_rotation(text).ok_or_else(|| parse_error(ROTATION_MARKER, text))?;
    let score = parse_score(text, normalization).ok_or_else(|| parse_error(SCORE_MARKER, text))?;

    let summary = text.lines().find(|line| line.contains(ALIGNED_LENGTH_MARKER));
    let aligned_length = summary
        .and_then(|line| value_after(line, ALIGNED_LENGTH_MARKER))
        .and_then(|v| v.parse().ok());
    let rmsd = summary
        .and_then(|line| value_after(line, RMSD_MARKER))
        .and_then(|v| v.parse().ok());

    Ok(Superposition {
        transform,
        score,
        rmsd,
        aligned_length,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const REPORT: &str = "\
 ********************************************************************
 * US-align (Version 20230609)                                      *
 * Universal Structure Alignment of Proteins and Nucleic Acids      *
 ********************************************************************

Name of Structure_1: /tmp/stackalign-mobile.pdb:A (to be superimposed onto Structure_2)
Name of Structure_2: /tmp/stackalign-target.pdb:A
Length of Structure_1: 85 residues
Length of Structure_2: 96 residues

Aligned length=   72, RMSD=   2.33, Seq_ID=n_identical/n_aligned= 0.181
TM-score= 0.70821 (normalized by length of Structure_1: L=85, d0=3.37)
TM-score= 0.63410 (normalized by length of Structure_2: L=96, d0=3.61)
(You should use TM-score normalized by length of the reference structure)

------ The rotation matrix to rotate Structure_1 to Structure_2 ------
m               t[m]        u[m][0]        u[m][1]        u[m][2]
0      12.3456789012   0.0000000000  -1.0000000000   0.0000000000
1      -4.5000000000   1.0000000000   0.0000000000   0.0000000000
2       0.2500000000   0.0000000000   0.0000000000   1.0000000000

Code for rotating Structure 1 from (x,y,z) to (X,Y,Z):
for(i=0; i<L; i++)
{
   X[i] = t[0] + u[0][0]*x[i] + u[0][1]*y[i] + u[0][2]*z[i];
   Y[i] = t[1] + u[1][0]*x[i] + u[1][1]*y[i] + u[1][2]*z[i];
   Z[i] = t[2] + u[2][0]*x[i] + u[2][1]*y[i] + u[2][2]*z[i];
}
";

    #[test]
    fn parses_matrix_translation_and_scores() {
        let report = parse_report(REPORT, ScoreNormalization::Mobile).unwrap();
        assert_eq!(
            report.transform.rotation,
            Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0)
        );
        assert_eq!(
            report.transform.translation,
            Vector3::new(12.3456789012, -4.5, 0.25)
        );
        assert_eq!(report.score, 0.70821);
        assert_eq!(report.aligned_length, Some(72));
        assert_eq!(report.rmsd, Some(2.33));
    }

    #[test]
    fn target_normalization_reads_second_score() {
        let report = parse_report(REPORT, ScoreNormalization::Target).unwrap();
        assert_eq!(report.score, 0.63410);
    }

    #[test]
    fn missing_matrix_is_reported() {
        let text = REPORT.replace("rotation matrix", "something else");
        match parse_report(&text, ScoreNormalization::Mobile) {
            Err(EngineError::OutputParse { missing, snippet }) => {
                assert_eq!(missing, ROTATION_MARKER);
                assert_eq!(snippet.chars().count(), SNIPPET_LENGTH);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_score_is_reported() {
        let text: String = REPORT
            .lines()
            .filter(|l| !l.starts_with("TM-score="))
            .map(|l| format!("{l}\n"))
            .collect();
        assert!(matches!(
            parse_report(&text, ScoreNormalization::Mobile),
            Err(EngineError::OutputParse { missing: SCORE_MARKER, .. })
        ));
    }

    #[test]
    fn truncated_matrix_is_rejected() {
        let cut = REPORT.find("\n2 ").unwrap();
        assert!(parse_report(&REPORT[..cut], ScoreNormalization::Mobile).is_err());
    }

    #[test]
    fn summary_line_is_optional() {
        let text = REPORT.replace("Aligned length=   72, RMSD=   2.33,", "");
        let report = parse_report(&text, ScoreNormalization::Mobile).unwrap();
        assert_eq!(report.aligned_length, None);
        assert_eq!(report.rmsd, None);
    }
}
