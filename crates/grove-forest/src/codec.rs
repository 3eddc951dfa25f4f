//! Text model format: a forest header record, then one `TREE` record per
//! tree followed by that tree's `NODE` records.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::config::{ForestType, PredictConfig};
use crate::error::ForestError;
use crate::forest::Forest;
use crate::record::{Record, RecordBuilder};
use crate::tree::DecisionTree;

/// Text format version written into every header.
pub const TEXT_FORMAT_VERSION: u32 = 1;

/// Writes forests in the text model format.
#[derive(Debug)]
pub struct ForestWriter<W: Write> {
    out: W,
}

impl<W: Write> ForestWriter<W> {
    /// Wrap an output stream.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write the forest header record.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Stream`] if the write fails.
    pub fn write_header(
        &mut self,
        n_trees: usize,
        target: &str,
        intercept: f64,
        config: &PredictConfig,
    ) -> Result<(), ForestError> {
        let line = RecordBuilder::new()
            .raw("FOREST", config.forest_type)
            .raw("VERSION", TEXT_FORMAT_VERSION)
            .text("TARGET", target)
            .raw("NTREES", n_trees)
            .raw("INTERCEPT", intercept)
            .text("COSTS", &config.costs)
            .text("DENTROPY", &config.dentropy)
            .text("ADACOSTS", &config.adacosts)
            .text("RFWEIGHTS", &config.rfweights)
            .text("BLACKLIST", &config.blacklist)
            .raw("L1", config.l1)
            .raw("DENSITY", config.density)
            .text("POSITIVE", &config.positive)
            .raw("ENTROPY", config.entropy)
            .raw("ADABOOST", config.adaboost)
            .raw("GRADBOOST", config.gradboost)
            .raw("ORDINAL", config.ordinal)
            .raw("EXPIT", config.expit)
            .build();
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    /// Write one tree under the given zero-based index.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Stream`] if the write fails.
    pub fn write_tree(&mut self, index: usize, tree: &DecisionTree) -> Result<(), ForestError> {
        tree.write_records(index, &mut self.out)?;
        Ok(())
    }

    /// Write a whole forest: header, then every tree in order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Stream`] if any write fails.
    #[instrument(skip_all, fields(n_trees = forest.n_trees()))]
    pub fn write_forest(&mut self, forest: &Forest) -> Result<(), ForestError> {
        self.write_header(
            forest.n_trees(),
            forest.target(),
            forest.intercept,
            &forest.config,
        )?;
        for (i, tree) in forest.trees.iter().enumerate() {
            self.write_tree(i, tree)?;
        }
        self.out.flush()?;
        debug!("forest written");
        Ok(())
    }

    /// Unwrap the output stream.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Reads forests in the text model format.
#[derive(Debug)]
pub struct ForestReader<R: BufRead> {
    input: R,
    line: usize,
    buf: String,
}

/// Header fields needed to finish reading a forest.
struct Header {
    config: PredictConfig,
    n_trees: usize,
    intercept: f64,
}

impl<R: BufRead> ForestReader<R> {
    /// Wrap an input stream.
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: 0,
            buf: String::new(),
        }
    }

    /// Read one forest from the stream.
    ///
    /// Blank lines are ignored. Either the whole forest is returned or an
    /// error; nothing partially read escapes.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::Stream`] | reading fails |
    /// | [`ForestError::EmptyStream`] | no records at all |
    /// | [`ForestError::MalformedRecord`] | a line is not a valid record, or records are out of place |
    /// | [`ForestError::MissingField`] | a required header or tree field is absent |
    /// | [`ForestError::InvalidValue`] | a number or boolean does not parse |
    /// | [`ForestError::UnknownForestType`] | the `FOREST` tag is not a known type |
    /// | [`ForestError::UnsupportedVersion`] | `VERSION` is not [`TEXT_FORMAT_VERSION`] |
    /// | [`ForestError::Truncated`] | fewer trees than `NTREES` |
    /// | [`ForestError::InvalidTree`] | node records do not form a tree |
    #[instrument(skip_all)]
    pub fn read_forest(&mut self) -> Result<Forest, ForestError> {
        let first = self.next_record()?.ok_or(ForestError::EmptyStream)?;
        let header = Self::parse_header(&first)?;

        let mut trees = Vec::with_capacity(header.n_trees);
        let mut current: Option<(Record, Vec<Record>)> = None;

        while let Some(rec) = self.next_record()? {
            match rec.kind() {
                "TREE" => {
                    if let Some((tree_header, nodes)) = current.take() {
                        trees.push(Self::finish_tree(trees.len(), &tree_header, &nodes)?);
                    }
                    let index: usize = rec.parse_field("TREE")?;
                    if index != trees.len() {
                        return Err(ForestError::MalformedRecord {
                            line: rec.line(),
                            reason: format!("expected tree {}, found tree {index}", trees.len()),
                        });
                    }
                    if index >= header.n_trees {
                        return Err(ForestError::MalformedRecord {
                            line: rec.line(),
                            reason: format!(
                                "header declares {} trees but stream has more",
                                header.n_trees
                            ),
                        });
                    }
                    current = Some((rec, Vec::new()));
                }
                "NODE" => match current.as_mut() {
                    Some((_, nodes)) => nodes.push(rec),
                    None => {
                        return Err(ForestError::MalformedRecord {
                            line: rec.line(),
                            reason: "node record before any tree record".to_string(),
                        });
                    }
                },
                other => {
                    return Err(ForestError::MalformedRecord {
                        line: rec.line(),
                        reason: format!("unexpected {other} record"),
                    });
                }
            }
        }
        if let Some((tree_header, nodes)) = current.take() {
            trees.push(Self::finish_tree(trees.len(), &tree_header, &nodes)?);
        }

        if trees.len() != header.n_trees {
            return Err(ForestError::Truncated {
                expected: header.n_trees,
                found: trees.len(),
            });
        }

        let forest = Forest::new(header.config, header.intercept, trees);
        info!(
            forest_type = %forest.forest_type(),
            n_trees = forest.n_trees(),
            "forest read"
        );
        Ok(forest)
    }

    fn parse_header(rec: &Record) -> Result<Header, ForestError> {
        if rec.kind() != "FOREST" {
            return Err(ForestError::MalformedRecord {
                line: rec.line(),
                reason: format!("expected FOREST header, found {} record", rec.kind()),
            });
        }
        let forest_type: ForestType = rec.head().parse()?;
        let version: u32 = rec.parse_field("VERSION")?;
        if version != TEXT_FORMAT_VERSION {
            return Err(ForestError::UnsupportedVersion {
                expected: TEXT_FORMAT_VERSION,
                found: version,
            });
        }

        let config = PredictConfig::new(forest_type)
            .with_target(rec.require("TARGET")?)
            .with_costs(rec.require("COSTS")?)
            .with_dentropy(rec.require("DENTROPY")?)
            .with_adacosts(rec.require("ADACOSTS")?)
            .with_rfweights(rec.require("RFWEIGHTS")?)
            .with_blacklist(rec.require("BLACKLIST")?)
            .with_l1(rec.parse_field("L1")?)
            .with_density(rec.parse_field("DENSITY")?)
            .with_positive(rec.require("POSITIVE")?)
            .with_entropy(rec.parse_field("ENTROPY")?)
            .with_adaboost(rec.parse_field("ADABOOST")?)
            .with_gradboost(rec.parse_field("GRADBOOST")?)
            .with_ordinal(rec.parse_field("ORDINAL")?)
            .with_expit(rec.parse_field("EXPIT")?);

        Ok(Header {
            config,
            n_trees: rec.parse_field("NTREES")?,
            intercept: rec.parse_field("INTERCEPT")?,
        })
    }

    fn finish_tree(
        index: usize,
        header: &Record,
        nodes: &[Record],
    ) -> Result<DecisionTree, ForestError> {
        let tree = DecisionTree::from_records(index, header, nodes)?;
        debug!(tree = index, n_nodes = tree.n_nodes(), "tree read");
        Ok(tree)
    }

    /// Return the next non-blank record, or `None` at end of stream.
    fn next_record(&mut self) -> Result<Option<Record>, ForestError> {
        loop {
            self.buf.clear();
            if self.input.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buf.trim_end_matches(['\n', '\r']);
            if text.trim().is_empty() {
                continue;
            }
            return Record::parse(self.line, text).map(Some);
        }
    }
}

impl Forest {
    /// Write this forest to `path` in the text model format.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::WriteModel`] if the file cannot be created or written.
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save_text(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        let write_err = |source| ForestError::WriteModel {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(write_err)?;
        let mut writer = ForestWriter::new(BufWriter::new(file));
        match writer.write_forest(self) {
            Ok(()) => Ok(()),
            Err(ForestError::Stream { source }) => Err(write_err(source)),
            Err(other) => Err(other),
        }
    }

    /// Read a forest from a text model file.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ReadModel`] if the file cannot be opened or read,
    /// or any parse error from [`ForestReader::read_forest`].
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load_text(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let read_err = |source| ForestError::ReadModel {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(read_err)?;
        match ForestReader::new(BufReader::new(file)).read_forest() {
            Err(ForestError::Stream { source }) => Err(read_err(source)),
            other => other,
        }
    }
}
