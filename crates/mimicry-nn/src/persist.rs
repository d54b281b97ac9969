//! Binary model format
//!
//! ```text
//! magic    : 4 bytes  "MMCY"
//! version  : u32 LE   1
//! blocks   : (length: u64 LE, payload: length × f32 LE) ...
//! ```
//!
//! One block per weight matrix (row-major) for every layer in forward order,
//! followed by one block per bias vector in the same order. The file carries
//! no other shape information: the reader is given the expected architecture
//! as a template [`ParameterSet`] and rejects any block whose length differs.
//!
//! Optimizer moments are not stored.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    matrix::Matrix,
    params::{LayerParams, ParameterSet},
};

pub const MAGIC: [u8; 4] = *b"MMCY";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum PersistError {
    #[display("failed to write model to {}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[display("failed to read model from {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[display("not a model file (bad magic)")]
    BadMagic,
    #[display("unsupported model format version {version}")]
    UnsupportedVersion { version: u32 },
    #[display("model shape mismatch in block {block}: expected {expected} values, found {actual}")]
    ShapeMismatch {
        block: usize,
        expected: usize,
        actual: u64,
    },
    #[display("model file is truncated")]
    Truncated,
    #[display("model file has {count} unexpected trailing bytes")]
    TrailingBytes { count: usize },
}

/// Number of blocks a parameter set is written as.
#[must_use]
pub fn block_count(params: &ParameterSet) -> usize {
    params.layers().len() * 2
}

fn blocks(params: &ParameterSet) -> impl Iterator<Item = &[f32]> {
    let weights = params.layers().iter().map(|l| l.weights.as_slice());
    let biases = params.layers().iter().map(|l| l.bias.as_slice());
    weights.chain(biases)
}

/// Serializes `params` into `writer`.
pub fn write_to<W>(params: &ParameterSet, mut writer: W) -> io::Result<()>
where
    W: Write,
{
    writer.write_all(&MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    for block in blocks(params) {
        writer.write_all(&(block.len() as u64).to_le_bytes())?;
        for value in block {
            writer.write_all(&value.to_le_bytes())?;
        }
    }
    writer.flush()
}

/// Deserializes parameters shaped like `template` from `bytes`.
pub fn from_bytes(template: &ParameterSet, bytes: &[u8]) -> Result<ParameterSet, PersistError> {
    let mut reader = ByteReader { bytes };
    if reader.take(MAGIC.len())? != MAGIC {
        return Err(PersistError::BadMagic);
    }
    let version = reader.u32()?;
    if version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion { version });
    }

    let mut values = Vec::with_capacity(block_count(template));
    for (block, expected) in blocks(template).map(<[f32]>::len).enumerate() {
        let actual = reader.u64()?;
        if usize::try_from(actual).ok() != Some(expected) {
            return Err(PersistError::ShapeMismatch {
                block,
                expected,
                actual,
            });
        }
        let payload = reader.take(expected * 4)?;
        let block = payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect::<Vec<_>>();
        values.push(block);
    }
    if !reader.bytes.is_empty() {
        return Err(PersistError::TrailingBytes {
            count: reader.bytes.len(),
        });
    }

    let layer_count = template.layers().len();
    let biases = values.split_off(layer_count);
    let mut layers = Vec::with_capacity(layer_count);
    for (block, (shape, (weights, bias))) in template
        .layers()
        .iter()
        .zip(values.into_iter().zip(biases))
        .enumerate()
    {
        let actual = weights.len() as u64;
        let weights = Matrix::from_vec(shape.in_dim(), shape.out_dim(), weights).map_err(|_| {
            PersistError::ShapeMismatch {
                block,
                expected: shape.in_dim() * shape.out_dim(),
                actual,
            }
        })?;
        layers.push(LayerParams { weights, bias });
    }
    Ok(ParameterSet::new(layers))
}

/// Writes `params` to `path`, replacing any existing file.
pub fn save(params: &ParameterSet, path: &Path) -> Result<(), PersistError> {
    let write_error = |source| PersistError::Write {
        path: path.to_owned(),
        source,
    };
    let file = File::create(path).map_err(write_error)?;
    write_to(params, BufWriter::new(file)).map_err(write_error)?;
    tracing::debug!(path = %path.display(), parameters = params.len(), "saved model");
    Ok(())
}

/// Reads parameters shaped like `template` from `path`.
///
/// On error nothing is returned, so callers keep their current parameters.
pub fn load(template: &ParameterSet, path: &Path) -> Result<ParameterSet, PersistError> {
    let bytes = fs::read(path).map_err(|source| PersistError::Read {
        path: path.to_owned(),
        source,
    })?;
    let params = from_bytes(template, &bytes)?;
    tracing::debug!(path = %path.display(), parameters = params.len(), "loaded model");
    Ok(params)
}

struct ByteReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], PersistError> {
        if self.bytes.len() < len {
            return Err(PersistError::Truncated);
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn u32(&mut self) -> Result<u32, PersistError> {
        let mut buf = [0; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64, PersistError> {
        let mut buf = [0; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }
}
