//! Annotation file parsing.
//!
//! Two layouts are accepted:
//!
//! - [`Layout::Rows`]: one observation per line, `frame, ped, x, y`,
//!   separated by commas or whitespace. A leading non-numeric header
//!   line and `#` comments are skipped.
//! - [`Layout::Transposed`]: exactly four lines holding, column by
//!   column, the frame ids, pedestrian ids, `y` and `x`.
//!
//! Ids may be written as floats (`1.0000000e+00`) but must be
//! non-negative integers; pedestrian id 0 is reserved for empty slots.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::DataError;

/// One annotated position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    /// Frame id. Frames are ordered by id.
    pub frame: u32,
    /// Pedestrian id, never 0.
    pub ped: u32,
    /// Normalized horizontal position.
    pub x: f64,
    /// Normalized vertical position.
    pub y: f64,
}

/// Column layout of an annotation file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Layout {
    /// Pick [`Transposed`](Layout::Transposed) for a four-line file
    /// whose lines have more than four fields, [`Rows`](Layout::Rows)
    /// otherwise.
    #[default]
    Auto,
    /// One `frame, ped, x, y` record per line.
    Rows,
    /// Four lines: frames, pedestrians, `y`, `x`.
    Transposed,
}

/// Parse every observation from `reader`.
///
/// # Errors
///
/// [`DataError::Io`] on read failure, [`DataError::Parse`] for malformed
/// fields, [`DataError::Empty`] if nothing was found.
pub fn parse_observations<R: BufRead>(reader: R, layout: Layout) -> Result<Vec<Observation>, DataError> {
    let mut lines = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines.push((idx + 1, split_fields(trimmed)));
    }

    let layout = match layout {
        Layout::Auto => {
            if lines.len() == 4 && lines[0].1.len() > 4 {
                Layout::Transposed
            } else {
                Layout::Rows
            }
        }
        other => other,
    };

    let observations = match layout {
        Layout::Transposed => parse_transposed(&lines)?,
        _ => parse_rows(&lines)?,
    };
    if observations.is_empty() {
        return Err(DataError::Empty);
    }
    Ok(observations)
}

/// Open and parse one annotation file.
///
/// # Errors
///
/// [`DataError::Open`] if the file cannot be opened, otherwise as
/// [`parse_observations`].
pub fn read_observations(path: &Path, layout: Layout) -> Result<Vec<Observation>, DataError> {
    let file = File::open(path).map_err(|source| DataError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_observations(BufReader::new(file), layout)
}

fn split_fields(line: &str) -> Vec<String> {
    if line.contains(',') {
        line.split(',').map(|f| f.trim().to_string()).collect()
    } else {
        line.split_whitespace().map(str::to_string).collect()
    }
}

fn parse_rows(lines: &[(usize, Vec<String>)]) -> Result<Vec<Observation>, DataError> {
    let mut out = Vec::with_capacity(lines.len());
    for (k, (line, fields)) in lines.iter().enumerate() {
        if k == 0 && fields.first().is_some_and(|f| f.parse::<f64>().is_err()) {
            continue;
        }
        if fields.len() < 4 {
            return Err(DataError::Parse {
                line: *line,
                column: fields.len() + 1,
                reason: format!("expected 4 fields, found {}", fields.len()),
            });
        }
        let frame = parse_id(&fields[0], *line, 1)?;
        let ped = parse_ped(&fields[1], *line, 2)?;
        let x = parse_real(&fields[2], *line, 3)?;
        let y = parse_real(&fields[3], *line, 4)?;
        out.push(Observation { frame, ped, x, y });
    }
    Ok(out)
}

fn parse_transposed(lines: &[(usize, Vec<String>)]) -> Result<Vec<Observation>, DataError> {
    if lines.len() != 4 {
        return Err(DataError::Parse {
            line: lines.last().map_or(1, |(l, _)| *l),
            column: 1,
            reason: format!("transposed layout needs 4 lines, found {}", lines.len()),
        });
    }
    let width = lines[0].1.len();
    for (line, fields) in lines {
        if fields.len() != width {
            return Err(DataError::Parse {
                line: *line,
                column: fields.len().min(width) + 1,
                reason: format!("expected {width} fields, found {}", fields.len()),
            });
        }
    }

    let (frames, peds, ys, xs) = (&lines[0], &lines[1], &lines[2], &lines[3]);
    let mut out = Vec::with_capacity(width);
    for col in 0..width {
        out.push(Observation {
            frame: parse_id(&frames.1[col], frames.0, col + 1)?,
            ped: parse_ped(&peds.1[col], peds.0, col + 1)?,
            x: parse_real(&xs.1[col], xs.0, col + 1)?,
            y: parse_real(&ys.1[col], ys.0, col + 1)?,
        });
    }
    Ok(out)
}

fn parse_real(field: &str, line: usize, column: usize) -> Result<f64, DataError> {
    let v: f64 = field.parse().map_err(|_| DataError::Parse {
        line,
        column,
        reason: format!("'{field}' is not a number"),
    })?;
    if !v.is_finite() {
        return Err(DataError::Parse {
            line,
            column,
            reason: format!("'{field}' is not finite"),
        });
    }
    Ok(v)
}

fn parse_id(field: &str, line: usize, column: usize) -> Result<u32, DataError> {
    let v = parse_real(field, line, column)?;
    if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
        return Err(DataError::Parse {
            line,
            column,
            reason: format!("'{field}' is not a non-negative integer id"),
        });
    }
    Ok(v as u32)
}

fn parse_ped(field: &str, line: usize, column: usize) -> Result<u32, DataError> {
    let id = parse_id(field, line, column)?;
    if id == 0 {
        return Err(DataError::Parse {
            line,
            column,
            reason: "pedestrian id 0 is reserved for empty slots".to_string(),
        });
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, layout: Layout) -> Result<Vec<Observation>, DataError> {
        parse_observations(text.as_bytes(), layout)
    }

    #[test]
    fn rows_with_header_and_comments() {
        let text = "frame_id,ped_id,x,y\n# comment\n10,1,0.5,0.25\n\n10,2,0.1,0.9\n20,1,0.55,0.3\n";
        let obs = parse(text, Layout::Auto).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(
            obs[0],
            Observation {
                frame: 10,
                ped: 1,
                x: 0.5,
                y: 0.25
            }
        );
        assert_eq!(obs[2].frame, 20);
    }

    #[test]
    fn whitespace_separated_rows_with_float_ids() {
        let text = "1.0\t3.0\t0.2\t0.4\n2.0  3.0  0.3  0.5\n";
        let obs = parse(text, Layout::Rows).unwrap();
        assert_eq!(obs[1].frame, 2);
        assert_eq!(obs[1].ped, 3);
        assert_eq!(obs[1].y, 0.5);
    }

    #[test]
    fn transposed_layout_swaps_coordinates_back() {
        let text = "1,1,2,2,3\n1,2,1,2,1\n0.1,0.2,0.3,0.4,0.5\n0.6,0.7,0.8,0.9,1.0\n";
        let obs = parse(text, Layout::Auto).unwrap();
        assert_eq!(obs.len(), 5);
        assert_eq!(
            obs[1],
            Observation {
                frame: 1,
                ped: 2,
                x: 0.7,
                y: 0.2
            }
        );
    }

    #[test]
    fn bad_fields_report_position() {
        let err = parse("1,1,0.5,0.5\n2,x,0.5,0.5\n", Layout::Rows).unwrap_err();
        assert!(matches!(err, DataError::Parse { line: 2, column: 2, .. }));

        let err = parse("1,0,0.5,0.5\n", Layout::Rows).unwrap_err();
        assert!(err.to_string().contains("reserved"));

        let err = parse("1,1.5,0.5,0.5\n", Layout::Rows).unwrap_err();
        assert!(matches!(err, DataError::Parse { column: 2, .. }));

        let err = parse("1,1,0.5\n", Layout::Rows).unwrap_err();
        assert!(matches!(err, DataError::Parse { line: 1, .. }));
    }

    #[test]
    fn ragged_transposed_rejected() {
        let text = "1,1,2,2,3\n1,2,1,2\n0.1,0.2,0.3,0.4,0.5\n0.6,0.7,0.8,0.9,1.0\n";
        assert!(matches!(
            parse(text, Layout::Transposed),
            Err(DataError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn empty_input_rejected() {
        assert!(matches!(parse("# nothing\n\n", Layout::Auto), Err(DataError::Empty)));
        assert!(matches!(parse("frame,ped,x,y\n", Layout::Auto), Err(DataError::Empty)));
    }

    #[test]
    fn missing_file_names_path() {
        let err = read_observations(Path::new("/definitely/not/here.csv"), Layout::Auto).unwrap_err();
        assert!(err.to_string().contains("not/here.csv"));
    }
}
