//! NNUE network weights: file format, feature indexing and the forward pass.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::board::{Color, Piece, Square};

use super::simd;
use super::{QA, QB, SCALE};

/// Hidden layer width (fixed by the engine; the file header must agree)
pub const HIDDEN_SIZE: usize = 256;

/// Features per king bucket: 2 colors x 6 piece types x 64 squares
pub const FEATURES_PER_BUCKET: usize = 768;

const MAGIC: [u8; 4] = *b"BSNT";
const FORMAT_VERSION: u8 = 1;

/// Output bias padding unit in i16 elements
const PAD_UNIT: usize = 16;

/// Accumulator pair: one hidden vector per perspective, each equal to the
/// feature bias plus the weights of that perspective's active features.
#[derive(Clone)]
pub struct Accumulator {
    /// `values[color]` is the accumulator from that color's perspective
    pub values: [[i16; HIDDEN_SIZE]; 2],
    /// Cleanliness flag per perspective; false means "needs refresh"
    pub computed: [bool; 2],
}

impl Accumulator {
    #[must_use]
    pub fn new() -> Self {
        Accumulator {
            values: [[0; HIDDEN_SIZE]; 2],
            computed: [false; 2],
        }
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator::new()
    }
}

/// Errors from loading a weight file.
#[derive(Debug)]
pub enum NetError {
    Io(std::io::Error),
    BadMagic,
    BadVersion(u8),
    /// The file was trained for a different hidden size
    BadHidden(u16),
    BadBucketCounts {
        input: u8,
        output: u8,
    },
    /// A king-bucket table entry points past the last input bucket
    BadBucketTable(u8),
    /// Fewer payload bytes than the header promises
    Truncated {
        expected: u64,
        found: u64,
    },
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Io(e) => write!(f, "io error: {e}"),
            NetError::BadMagic => write!(f, "not a network file (bad magic)"),
            NetError::BadVersion(v) => write!(f, "unsupported network format version {v}"),
            NetError::BadHidden(h) => {
                write!(f, "network hidden size {h} does not match engine ({HIDDEN_SIZE})")
            }
            NetError::BadBucketCounts { input, output } => {
                write!(f, "invalid bucket counts (input {input}, output {output})")
            }
            NetError::BadBucketTable(b) => {
                write!(f, "king bucket table entry {b} out of range")
            }
            NetError::Truncated { expected, found } => {
                write!(f, "network file truncated: expected {expected} bytes, found {found}")
            }
        }
    }
}

impl std::error::Error for NetError {}

impl From<std::io::Error> for NetError {
    fn from(e: std::io::Error) -> Self {
        NetError::Io(e)
    }
}

/// NNUE network weights.
pub struct NnueNetwork {
    pub(crate) input_buckets: usize,
    pub(crate) output_buckets: usize,
    /// King-square to input-bucket map, taken from the file header
    pub(crate) king_buckets: [u8; 64],
    /// Feature transformer weights, `input_buckets * 768` rows
    pub(crate) feature_weights: Vec<[i16; HIDDEN_SIZE]>,
    pub(crate) feature_bias: [i16; HIDDEN_SIZE],
    /// Per output bucket: one weight row per perspective (us, them)
    pub(crate) output_weights: Vec<[[i16; HIDDEN_SIZE]; 2]>,
    pub(crate) output_bias: Vec<i16>,
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8, NetError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(r: &mut R) -> Result<u16, NetError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64, NetError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_i16<R: Read>(r: &mut R) -> Result<i16, NetError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

impl NnueNetwork {
    /// Load a network from a weight file on disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::from_reader(&mut reader)
    }

    /// Load a network from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self, NetError> {
        let mut reader = std::io::Cursor::new(data);
        Self::from_reader(&mut reader)
    }

    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, NetError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(NetError::BadMagic);
        }
        let version = read_u8(reader)?;
        if version != FORMAT_VERSION {
            return Err(NetError::BadVersion(version));
        }
        let hidden = read_u16(reader)?;
        if hidden as usize != HIDDEN_SIZE {
            return Err(NetError::BadHidden(hidden));
        }
        let input_buckets = read_u8(reader)?;
        let output_buckets = read_u8(reader)?;
        if input_buckets == 0 || output_buckets == 0 {
            return Err(NetError::BadBucketCounts {
                input: input_buckets,
                output: output_buckets,
            });
        }
        let mut king_buckets = [0u8; 64];
        reader.read_exact(&mut king_buckets)?;
        for &b in &king_buckets {
            if b >= input_buckets {
                return Err(NetError::BadBucketTable(b));
            }
        }
        let payload_len = read_u64(reader)?;

        let ib = input_buckets as usize;
        let ob = output_buckets as usize;
        let feature_rows = ib * FEATURES_PER_BUCKET;
        let pad = (ob + PAD_UNIT - 1) / PAD_UNIT * PAD_UNIT - ob;
        let expected =
            2 * (feature_rows * HIDDEN_SIZE + HIDDEN_SIZE + 2 * HIDDEN_SIZE * ob + ob + pad) as u64;
        if payload_len < expected {
            return Err(NetError::Truncated {
                expected,
                found: payload_len,
            });
        }

        let map_eof = |e: NetError, read_so_far: u64| match e {
            NetError::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                NetError::Truncated {
                    expected,
                    found: read_so_far,
                }
            }
            other => other,
        };

        let mut read_count = 0u64;
        let mut next = |r: &mut R| -> Result<i16, NetError> {
            let v = read_i16(r).map_err(|e| map_eof(e, read_count))?;
            read_count += 2;
            Ok(v)
        };

        let mut feature_weights = vec![[0i16; HIDDEN_SIZE]; feature_rows];
        for row in &mut feature_weights {
            for w in row.iter_mut() {
                *w = next(reader)?;
            }
        }

        let mut feature_bias = [0i16; HIDDEN_SIZE];
        for b in &mut feature_bias {
            *b = next(reader)?;
        }

        // Output weights arrive column-major (per lane across buckets) and
        // are transposed into per-bucket rows here
        let mut output_weights = vec![[[0i16; HIDDEN_SIZE]; 2]; ob];
        for lane in 0..2 * HIDDEN_SIZE {
            for bucket in 0..ob {
                let w = next(reader)?;
                output_weights[bucket][lane / HIDDEN_SIZE][lane % HIDDEN_SIZE] = w;
            }
        }

        let mut output_bias = vec![0i16; ob];
        for b in &mut output_bias {
            *b = next(reader)?;
        }
        for _ in 0..pad {
            next(reader)?;
        }

        Ok(NnueNetwork {
            input_buckets: ib,
            output_buckets: ob,
            king_buckets,
            feature_weights,
            feature_bias,
            output_weights,
            output_bias,
        })
    }

    /// Transform a king square into the half-board frame of `perspective`.
    #[inline]
    fn king_frame(perspective: Color, ksq: Square) -> Square {
        let k = if perspective == Color::Black {
            ksq.flip_vertical()
        } else {
            ksq
        };
        if k.file() > 3 {
            k.mirror_horizontal()
        } else {
            k
        }
    }

    /// Feature index of (piece color, piece type, square) as seen from
    /// `perspective` with its king on `ksq`.
    #[inline]
    #[must_use]
    pub fn feature_index(
        &self,
        perspective: Color,
        ksq: Square,
        piece_color: Color,
        piece: Piece,
        sq: Square,
    ) -> usize {
        let (mut k, mut s) = (ksq, sq);
        if perspective == Color::Black {
            k = k.flip_vertical();
            s = s.flip_vertical();
        }
        if k.file() > 3 {
            k = k.mirror_horizontal();
            s = s.mirror_horizontal();
        }
        let bucket = self.king_buckets[k.index()] as usize;
        bucket * FEATURES_PER_BUCKET
            + usize::from(piece_color != perspective) * 384
            + piece.index() * 64
            + s.index()
    }

    /// True when a king move from `from` to `to` lands in a different
    /// bucket or crosses the mirror boundary for its own perspective, so
    /// that perspective's accumulator must be rebuilt.
    #[inline]
    #[must_use]
    pub fn king_bucket_changed(&self, perspective: Color, from: Square, to: Square) -> bool {
        let from_frame = Self::king_frame(perspective, from);
        let to_frame = Self::king_frame(perspective, to);
        self.king_buckets[from_frame.index()] != self.king_buckets[to_frame.index()]
            || (from.file() > 3) != (to.file() > 3)
    }

    /// Output bucket from the piece count: 2..=32 pieces partitioned
    /// linearly into `output_buckets` ranges.
    #[inline]
    #[must_use]
    pub fn output_bucket(&self, piece_count: u32) -> usize {
        let divisor = (30 + self.output_buckets - 1) / self.output_buckets;
        ((piece_count.saturating_sub(2) as usize) / divisor).min(self.output_buckets - 1)
    }

    /// Forward pass over a clean accumulator pair. Returns the score in
    /// centipawn-scaled units from the side to move's point of view.
    #[must_use]
    pub fn evaluate(&self, acc: &Accumulator, stm: Color, piece_count: u32) -> i32 {
        debug_assert!(acc.computed[0] && acc.computed[1], "stale accumulator");
        let bucket = self.output_bucket(piece_count);
        let weights = &self.output_weights[bucket];

        let us = stm.index();
        let them = (!stm).index();
        let sum = simd::screlu_dot(&acc.values[us], &weights[0])
            + simd::screlu_dot(&acc.values[them], &weights[1]);

        (sum / QA + i32::from(self.output_bias[bucket])) * SCALE / (QA * QB)
    }
}

/// Serialize a synthetic network with seeded random weights. Test support
/// for the loader, the accumulator round-trip properties and the UCI
/// `EvalFile` path.
#[cfg(test)]
pub(crate) fn encode_network(
    input_buckets: u8,
    output_buckets: u8,
    king_buckets: &[u8; 64],
    seed: u64,
) -> Vec<u8> {
    use rand::prelude::*;

    let mut rng = StdRng::seed_from_u64(seed);
    let ib = input_buckets as usize;
    let ob = output_buckets as usize;
    let pad = (ob + PAD_UNIT - 1) / PAD_UNIT * PAD_UNIT - ob;
    let count = ib * FEATURES_PER_BUCKET * HIDDEN_SIZE + HIDDEN_SIZE + 2 * HIDDEN_SIZE * ob + ob;

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&(HIDDEN_SIZE as u16).to_le_bytes());
    bytes.push(input_buckets);
    bytes.push(output_buckets);
    bytes.extend_from_slice(king_buckets);
    bytes.extend_from_slice(&(2 * (count + pad) as u64).to_le_bytes());
    for _ in 0..count {
        bytes.extend_from_slice(&rng.gen_range(-64i16..=64).to_le_bytes());
    }
    for _ in 0..pad {
        bytes.extend_from_slice(&0i16.to_le_bytes());
    }
    bytes
}
