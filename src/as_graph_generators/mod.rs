pub mod caida;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bzip2::read::BzDecoder;

use crate::as_graph::ASGraph;
use crate::shared::LoadError;

pub use caida::{CAIDAASGraphReader, CAIDAOrgReader};

pub trait ASGraphGenerator {
    fn generate(&self) -> Result<ASGraph, LoadError>;
}

/// Open a text input, decompressing it when the name ends in `.bz2`.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let is_bz2 = path.extension().map(|ext| ext == "bz2").unwrap_or(false);
    if is_bz2 {
        Ok(Box::new(BufReader::new(BzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
