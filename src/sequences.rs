//! Sequence subsets for decomposed guide trees.
//!
//! Each sub-tree of a decomposition becomes one FASTA file holding the
//! sequences of its leaves, written as `subset_<n>.txt` with `n` counting
//! from 1 in decomposition order.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use bio::io::fasta;
pub use bio::io::fasta::Record as FastaRecord;
use tracing::info;

use crate::decompose::decompose;
use crate::error::{Result, TreeError};
use crate::io::{LoadOptions, create_writer, load_tree, open_reader};

/// Read every record of a FASTA file, gzip-aware. Sequences are kept as
/// they are, gaps included.
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>> {
    let reader = fasta::Reader::new(open_reader(path.as_ref())?);
    let records = reader
        .records()
        .map(|r| r.map_err(|e| TreeError::Fasta(e.to_string())))
        .collect::<Result<Vec<_>>>()?;
    info!(path = %path.as_ref().display(), records = records.len(), "read sequences");
    Ok(records)
}

/// Write the records named in `taxa` to `path`, in the order of `taxa`.
///
/// # Errors
/// `TreeError::MissingSequence` if a label has no record; no file is created
/// in that case.
pub fn write_fasta<P, S>(records: &[FastaRecord], path: P, taxa: &[S]) -> Result<()>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let by_id: HashMap<&str, &FastaRecord> = records.iter().map(|r| (r.id(), r)).collect();
    let selected = taxa
        .iter()
        .map(|t| {
            by_id
                .get(t.as_ref())
                .copied()
                .ok_or_else(|| TreeError::MissingSequence(t.as_ref().to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut writer = fasta::Writer::new(create_writer(path.as_ref())?);
    for record in selected {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Decompose the guide tree with [`decompose`] and write the sequences of
/// each sub-tree to `subsets_dir/subset_<n>.txt`. Returns the written paths.
pub fn decompose_guide_tree<P, Q, R>(
    subsets_dir: P,
    sequences_path: Q,
    guide_tree_path: R,
    max_subset_size: Option<usize>,
    max_num_subsets: Option<usize>,
) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let sequences = read_fasta(sequences_path)?;
    let guide_tree = load_tree(guide_tree_path, &LoadOptions::default())?;
    let trees = decompose(guide_tree, max_subset_size, max_num_subsets)?;

    fs::create_dir_all(subsets_dir.as_ref())?;
    trees
        .iter()
        .enumerate()
        .map(|(n, tree)| -> Result<PathBuf> {
            let path = subsets_dir.as_ref().join(format!("subset_{}.txt", n + 1));
            write_fasta(&sequences, &path, &tree.leaf_labels()?)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn scratch(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("tree-decomposition-seq-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn ids(path: &Path) -> Vec<String> {
        read_fasta(path).unwrap().iter().map(|r| r.id().to_string()).collect()
    }

    const SEQUENCES: &str = ">A\nAC-GT\n>B\nACGGT\n>C\nA--GT\n>D\nTCGGA\n>E first sample\nTTGGA\n";

    #[test]
    fn test_read_fasta_keeps_gaps() {
        let dir = scratch("read");
        let path = dir.join("seqs.fasta");
        fs::write(&path, SEQUENCES).unwrap();

        let records = read_fasta(&path).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].seq(), b"AC-GT");
        assert_eq!(records[4].id(), "E");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_write_fasta_in_requested_order() {
        let dir = scratch("write");
        let input = dir.join("seqs.fasta");
        fs::write(&input, SEQUENCES).unwrap();
        let records = read_fasta(&input).unwrap();

        let out = dir.join("picked.fasta");
        write_fasta(&records, &out, &["C", "A"]).unwrap();
        assert_eq!(ids(&out), vec!["C", "A"]);
        assert_eq!(read_fasta(&out).unwrap()[0].seq(), b"A--GT");

        let missing = write_fasta(&records, dir.join("bad.fasta"), &["A", "Z"]);
        assert!(matches!(missing, Err(TreeError::MissingSequence(label)) if label == "Z"));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_decompose_guide_tree() {
        let dir = scratch("guide");
        let sequences = dir.join("seqs.fasta");
        let tree = dir.join("guide.nwk");
        fs::write(&sequences, SEQUENCES).unwrap();
        fs::write(&tree, "((A,B),(C,(D,E)));\n").unwrap();

        let subsets = dir.join("subsets");
        let paths = decompose_guide_tree(&subsets, &sequences, &tree, Some(3), Some(10)).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], subsets.join("subset_1.txt"));

        let mut all: Vec<String> = paths.iter().flat_map(|p| ids(p)).collect();
        assert!(paths.iter().all(|p| ids(p).len() <= 3));
        all.sort();
        assert_eq!(all, vec!["A", "B", "C", "D", "E"]);
        fs::remove_dir_all(dir).unwrap();
    }
}
