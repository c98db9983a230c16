//! Matching through an external program.
//!
//! The program is invoked as `program [args] -e <graph> -w <matching>`. The
//! graph file holds a `nodes edges` header followed by one `a b weight` line per
//! edge with integer weights; the matching file holds a `nodes edges` header
//! followed by one `a b` line per chosen edge.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matching::{check_edges, MatchingError, MatchingOracle, WeightedEdge};

/// Default factor applied to weights before rounding to integers
pub const DEFAULT_WEIGHT_SCALE: f64 = 1000.0;

/// How the graph is presented to the program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphStyle {
    /// Complete graph with negated weights, for minimum-cost perfect matching
    /// programs such as blossom5. Missing pairs are written with weight zero.
    PerfectClique,

    /// Only the given edges, weights as is
    Sparse,
}

#[derive(Debug, Clone)]
pub struct ExternalMatching {
    program: PathBuf,
    args: Vec<String>,
    style: GraphStyle,
    weight_scale: f64,
}

impl ExternalMatching {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, style: GraphStyle) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            style,
            weight_scale: DEFAULT_WEIGHT_SCALE,
        }
    }

    /// blossom5 maximum weight perfect matching
    #[must_use]
    pub fn blossom5(program: impl Into<PathBuf>) -> Self {
        Self::new(program, GraphStyle::PerfectClique)
    }

    /// `matchGraph.py` maximum weight matching
    #[must_use]
    pub fn maximum_weight(program: impl Into<PathBuf>) -> Self {
        Self::new(program, GraphStyle::Sparse)
    }

    /// `matchGraph.py -c` maximum cardinality matching
    #[must_use]
    pub fn maximum_cardinality(program: impl Into<PathBuf>) -> Self {
        Self::new(program, GraphStyle::Sparse).with_args(["-c"])
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_weight_scale(mut self, weight_scale: f64) -> Self {
        self.weight_scale = weight_scale;
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[allow(clippy::cast_possible_truncation)]
    fn scaled(&self, weight: f64) -> i64 {
        (weight * self.weight_scale).round() as i64
    }

    /// Write the graph in the program's input format.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_graph<W: Write>(
        &self,
        writer: &mut W,
        edges: &[WeightedEdge],
        node_count: usize,
    ) -> std::io::Result<()> {
        match self.style {
            GraphStyle::Sparse => {
                writeln!(writer, "{} {}", node_count, edges.len())?;
                for edge in edges {
                    writeln!(writer, "{} {} {}", edge.a, edge.b, self.scaled(edge.weight))?;
                }
            }
            GraphStyle::PerfectClique => {
                let mut weights: BTreeMap<(usize, usize), i64> = BTreeMap::new();
                for edge in edges {
                    weights.entry(edge.key()).or_insert(-self.scaled(edge.weight));
                }
                let pair_count = node_count * node_count.saturating_sub(1) / 2;
                writeln!(writer, "{node_count} {pair_count}")?;
                for a in 0..node_count {
                    for b in a + 1..node_count {
                        let weight = weights.get(&(a, b)).copied().unwrap_or(0);
                        writeln!(writer, "{a} {b} {weight}")?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Parse the program's output, keeping only pairs present in `edges`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::MalformedOutput`] for unparsable or out of range
    /// lines, and [`MatchingError::ImperfectMatching`] when a perfect matching
    /// was required but some node is left uncovered.
    pub fn read_matching<R: BufRead>(
        &self,
        reader: R,
        edges: &[WeightedEdge],
        node_count: usize,
    ) -> Result<Vec<WeightedEdge>, MatchingError> {
        let mut original: BTreeMap<(usize, usize), WeightedEdge> = BTreeMap::new();
        for edge in edges {
            original.entry(edge.key()).or_insert(*edge);
        }

        let mut lines = reader.lines();
        let header = lines.next().transpose()?.ok_or(MatchingError::MalformedOutput {
            line: 1,
            message: "missing header".to_string(),
        })?;
        let (declared_nodes, declared_edges) = parse_pair(&header, 1)?;
        if declared_nodes != node_count {
            return Err(MatchingError::MalformedOutput {
                line: 1,
                message: format!("expected {node_count} nodes, found {declared_nodes}"),
            });
        }

        let mut covered = vec![false; node_count];
        let mut covered_count = 0usize;
        let mut chosen = Vec::new();
        for index in 0..declared_edges {
            let line_number = index + 2;
            let line = lines.next().transpose()?.ok_or(MatchingError::MalformedOutput {
                line: line_number,
                message: format!("expected {declared_edges} edges"),
            })?;
            let (a, b) = parse_pair(&line, line_number)?;
            for node in [a, b] {
                match covered.get_mut(node) {
                    Some(flag) if !*flag => {
                        *flag = true;
                        covered_count += 1;
                    }
                    Some(_) => {
                        return Err(MatchingError::MalformedOutput {
                            line: line_number,
                            message: format!("node {node} matched twice"),
                        })
                    }
                    None => {
                        return Err(MatchingError::MalformedOutput {
                            line: line_number,
                            message: format!("node {node} out of range"),
                        })
                    }
                }
            }
            if let Some(edge) = original.get(&(a.min(b), a.max(b))) {
                chosen.push(*edge);
            }
        }

        if self.style == GraphStyle::PerfectClique
            && node_count % 2 == 0
            && covered_count != node_count
        {
            return Err(MatchingError::ImperfectMatching {
                covered: covered_count,
                node_count,
            });
        }
        Ok(chosen)
    }

    fn command_line(&self, input: &Path, output: &Path) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.extend([
            "-e".to_string(),
            input.display().to_string(),
            "-w".to_string(),
            output.display().to_string(),
        ]);
        parts.join(" ")
    }
}

fn parse_pair(line: &str, line_number: usize) -> Result<(usize, usize), MatchingError> {
    let mut fields = line.split_whitespace().map(str::parse::<usize>);
    match (fields.next(), fields.next()) {
        (Some(Ok(a)), Some(Ok(b))) => Ok((a, b)),
        _ => Err(MatchingError::MalformedOutput {
            line: line_number,
            message: format!("expected two node numbers, found '{line}'"),
        }),
    }
}

impl MatchingOracle for ExternalMatching {
    fn choose_matching(
        &self,
        edges: &[WeightedEdge],
        node_count: usize,
    ) -> Result<Vec<WeightedEdge>, MatchingError> {
        check_edges(edges, node_count)?;
        if node_count <= 1 {
            return Ok(Vec::new());
        }

        let dir = tempfile::tempdir()?;
        let input = dir.path().join("graph.txt");
        let output = dir.path().join("matching.txt");
        {
            let mut writer = std::io::BufWriter::new(std::fs::File::create(&input)?);
            self.write_graph(&mut writer, edges, node_count)?;
            writer.flush()?;
        }

        let command = self.command_line(&input, &output);
        debug!("Running matching program: {}", command);
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg("-e")
            .arg(&input)
            .arg("-w")
            .arg(&output)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if !status.success() {
            return Err(MatchingError::ProgramFailed {
                command,
                status: status.to_string(),
            });
        }

        let reader = BufReader::new(std::fs::File::open(&output)?);
        let matching = self.read_matching(reader, edges, node_count)?;
        debug!(
            "Matching of {} nodes with {} edges chose {} edges",
            node_count,
            edges.len(),
            matching.len()
        );
        Ok(matching)
    }
}
