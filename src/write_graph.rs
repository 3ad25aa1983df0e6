//! Writing the edge list and node map.
//!
//! Both outputs are tab-separated text. All files of a run are written to
//! temporary siblings first and renamed into place only once every one of
//! them is complete, so a failed run never leaves a truncated file or a
//! mismatched edge list and node map under the destination names.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::schemas::{EdgeList, NodeMap};

/// Fractional digits used for values unless configured otherwise (`%f`).
pub const DEFAULT_VALUE_PRECISION: usize = 6;

/// Write the edge list rows in order.
///
/// Aggregated rows are `from\tto\tcount\ttotal_value`, raw rows are
/// `from\tto\tvalue`.
pub fn write_edge_list<W: Write>(out: &mut W, edges: &EdgeList, precision: usize) -> std::io::Result<()> {
    match edges {
        EdgeList::Aggregated(edges) => {
            for e in edges {
                writeln!(out, "{}\t{}\t{}\t{:.*}", e.from, e.to, e.count, precision, e.total_value)?;
            }
        }
        EdgeList::Raw(edges) => {
            for e in edges {
                writeln!(out, "{}\t{}\t{:.*}", e.from, e.to, precision, e.value)?;
            }
        }
    }
    Ok(())
}

/// Write `address\tnode_id` rows in id order.
pub fn write_node_map<W: Write>(out: &mut W, nodes: &NodeMap) -> std::io::Result<()> {
    for (address, id) in nodes.iter() {
        writeln!(out, "{}\t{}", address, id)?;
    }
    Ok(())
}

/// Outputs of one run, written to temporary siblings and renamed into place
/// together.
///
/// Nothing reaches a destination name until [`StagedOutputs::commit`]. If the
/// set is dropped without committing, every staged file is removed, so a run
/// that fails halfway leaves the previous outputs (if any) untouched.
#[derive(Debug, Default)]
pub struct StagedOutputs {
    /// `(temporary, destination)` pairs in staging order
    staged: Vec<(PathBuf, PathBuf)>,
}

impl StagedOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Write `path`'s content to its temporary sibling.
    pub fn stage<F>(&mut self, path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
    {
        let tmp_path = temporary_path(path);

        let result = (|| -> std::io::Result<()> {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            writer.get_ref().sync_all()
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(GraphError::io(format!("writing {}", path.display()), e));
        }

        debug!("Staged {:?}", tmp_path);
        self.staged.push((tmp_path, path.to_path_buf()));
        Ok(())
    }

    /// Rename every staged file into place.
    ///
    /// If a rename fails, the outputs already renamed by this commit are
    /// removed again along with the remaining temporaries.
    pub fn commit(mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);

        for (i, (tmp_path, path)) in staged.iter().enumerate() {
            if let Err(e) = std::fs::rename(tmp_path, path) {
                for (_, done) in &staged[..i] {
                    let _ = std::fs::remove_file(done);
                }
                for (pending, _) in &staged[i..] {
                    let _ = std::fs::remove_file(pending);
                }
                return Err(GraphError::io(
                    format!("renaming output to {}", path.display()),
                    e,
                ));
            }
        }

        info!("Committed {} output files", staged.len());
        Ok(())
    }
}

impl Drop for StagedOutputs {
    fn drop(&mut self) {
        for (tmp_path, _) in self.staged.drain(..) {
            let _ = std::fs::remove_file(&tmp_path);
        }
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Stage both graph outputs of a run.
pub fn write_outputs(
    staged: &mut StagedOutputs,
    edges: &EdgeList,
    nodes: &NodeMap,
    edge_list_path: &Path,
    node_map_path: &Path,
    precision: usize,
) -> Result<()> {
    staged.stage(edge_list_path, |w| write_edge_list(w, edges, precision))?;
    info!("Staged {} edges for {:?}", edges.len(), edge_list_path);

    staged.stage(node_map_path, |w| write_node_map(w, nodes))?;
    info!("Staged {} nodes for {:?}", nodes.len(), node_map_path);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{AggregatedEdge, Edge};

    fn render(edges: &EdgeList, precision: usize) -> String {
        let mut buf = Vec::new();
        write_edge_list(&mut buf, edges, precision).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_aggregated_rows() {
        let edges = EdgeList::Aggregated(vec![
            AggregatedEdge { from: 0, to: 1, count: 2, total_value: 100.0 },
            AggregatedEdge { from: 1, to: 0, count: 1, total_value: 5.0 },
        ]);
        assert_eq!(
            render(&edges, DEFAULT_VALUE_PRECISION),
            "0\t1\t2\t100.000000\n1\t0\t1\t5.000000\n"
        );
    }

    #[test]
    fn test_raw_rows_and_precision() {
        let edges = EdgeList::Raw(vec![Edge { from: 3, to: 4, value: 1.3 }]);
        assert_eq!(render(&edges, 6), "3\t4\t1.300000\n");
        assert_eq!(render(&edges, 2), "3\t4\t1.30\n");
        assert_eq!(render(&edges, 0), "3\t4\t1\n");
    }

    #[test]
    fn test_rounds_the_binary_value() {
        // 5e-7 is stored slightly below the decimal tie
        let edges = EdgeList::Raw(vec![Edge { from: 0, to: 1, value: 5e-7 }]);
        assert_eq!(render(&edges, 6), "0\t1\t0.000000\n");
    }

    #[test]
    fn test_node_map_rows() {
        let nodes = NodeMap::new(vec![10, 20]);
        let mut buf = Vec::new();
        write_node_map(&mut buf, &nodes).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "10\t0\n20\t1\n");
    }

    #[test]
    fn test_commit_moves_every_file_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let edges = dir.path().join("edges.tsv");
        let nodes = dir.path().join("nodes.tsv");

        let mut staged = StagedOutputs::new();
        assert!(staged.is_empty());
        staged.stage(&edges, |w| w.write_all(b"0\t1\t1.000000\n")).unwrap();
        staged.stage(&nodes, |w| w.write_all(b"10\t0\n")).unwrap();
        assert_eq!(staged.len(), 2);
        assert!(!edges.exists());
        assert!(temporary_path(&edges).exists());

        staged.commit().unwrap();
        assert_eq!(std::fs::read_to_string(&edges).unwrap(), "0\t1\t1.000000\n");
        assert_eq!(std::fs::read_to_string(&nodes).unwrap(), "10\t0\n");
        assert!(!temporary_path(&edges).exists());
        assert!(!temporary_path(&nodes).exists());
    }

    #[test]
    fn test_failed_write_discards_the_whole_set() {
        let dir = tempfile::tempdir().unwrap();
        let edges = dir.path().join("edges.tsv");
        let nodes = dir.path().join("nodes.tsv");

        let mut staged = StagedOutputs::new();
        staged.stage(&edges, |w| w.write_all(b"0\t1\t1.000000\n")).unwrap();
        let err = staged
            .stage(&nodes, |w| {
                w.write_all(b"10\t")?;
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            })
            .unwrap_err();
        assert_eq!(err.kind(), "io");
        drop(staged);

        assert!(!edges.exists());
        assert!(!nodes.exists());
        assert!(!temporary_path(&edges).exists());
        assert!(!temporary_path(&nodes).exists());
    }

    #[test]
    fn test_unwritable_destination_keeps_previous_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let edges = dir.path().join("edges.tsv");
        std::fs::write(&edges, "old\n").unwrap();
        let nodes = dir.path().join("missing").join("nodes.tsv");

        let mut staged = StagedOutputs::new();
        staged.stage(&edges, |w| w.write_all(b"new\n")).unwrap();
        let err = staged.stage(&nodes, |w| w.write_all(b"x")).unwrap_err();
        assert!(err.to_string().contains("nodes.tsv"));
        drop(staged);

        assert_eq!(std::fs::read_to_string(&edges).unwrap(), "old\n");
        assert!(!temporary_path(&edges).exists());
    }

    #[test]
    fn test_failed_rename_removes_committed_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("edges.tsv");
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let second = sub.join("nodes.tsv");

        let mut staged = StagedOutputs::new();
        staged.stage(&first, |w| w.write_all(b"a\n")).unwrap();
        staged.stage(&second, |w| w.write_all(b"b\n")).unwrap();
        std::fs::remove_dir_all(&sub).unwrap();

        assert!(staged.commit().is_err());
        assert!(!first.exists());
        assert!(!temporary_path(&first).exists());
    }
}
