// Replay scripts: JSON descriptions of buffer operations.
//
// A script is an array of single-key objects, applied in order to a
// `Buffer`:
//
//   {"write": "0x0102"}              stage bytes
//   {"write_byte": 7}                stage one byte (0..=255)
//   {"write_int": 300}               stage the low 8 bits of an integer
//   {"write_index": {"table": "bytes4", "key": "0xa9059cbb"}}
//                                    stage the index of a key
//   {"end": {"uncompressed": "0x..", "type": "stateless"}}
//                                    commit
//   {"snapshot": "name"}             take a named checkpoint
//   {"restore": "name"}              roll back to a named checkpoint
//   {"discard": true}                drop staged bytes

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use crate::encoder::encode_type::UnknownEncodeType;
use crate::encoder::indexes::decode_hex;
use crate::encoder::{Buffer, EncodeType, FlagNamespace, IndexTable, Snapshot};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("script must be a JSON array of operations")]
    NotAnArray,
    #[error("op {op}: {reason}")]
    InvalidOp { op: usize, reason: String },
    #[error("op {op}: invalid hex: {source}")]
    InvalidHex {
        op: usize,
        source: hex::FromHexError,
    },
    #[error("op {op}: {source}")]
    EncodeType {
        op: usize,
        source: UnknownEncodeType,
    },
    #[error("op {op}: unknown snapshot '{name}'")]
    UnknownSnapshot { op: usize, name: String },
    #[error("op {op}: {table} table has no key 0x{key}")]
    MissingIndex {
        op: usize,
        table: &'static str,
        key: String,
    },
}

fn invalid(op: usize, reason: impl Into<String>) -> ReplayError {
    ReplayError::InvalidOp {
        op,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// One replayable buffer operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Write(Vec<u8>),
    WriteByte(u8),
    WriteInt(u64),
    WriteIndex { table: IndexTable, key: Vec<u8> },
    End {
        uncompressed: Vec<u8>,
        encode_type: EncodeType,
    },
    Snapshot(String),
    Restore(String),
    Discard,
}

impl Op {
    fn parse(op: usize, value: &Value) -> Result<Self, ReplayError> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid(op, "operation must be a JSON object"))?;
        if obj.len() != 1 {
            return Err(invalid(op, "operation must have exactly one key"));
        }
        let Some((name, arg)) = obj.iter().next() else {
            return Err(invalid(op, "empty operation"));
        };

        let hex_arg = |v: &Value, what: &str| -> Result<Vec<u8>, ReplayError> {
            let s = v
                .as_str()
                .ok_or_else(|| invalid(op, format!("{what} must be a hex string")))?;
            decode_hex(s).map_err(|source| ReplayError::InvalidHex { op, source })
        };
        let u64_arg = |v: &Value, what: &str| -> Result<u64, ReplayError> {
            v.as_u64()
                .ok_or_else(|| invalid(op, format!("{what} must be a non-negative integer")))
        };
        let str_arg = |v: &Value, what: &str| -> Result<String, ReplayError> {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(op, format!("{what} must be a string")))
        };
        let field = |m: &Map<String, Value>, key: &str| -> Result<Value, ReplayError> {
            m.get(key)
                .cloned()
                .ok_or_else(|| invalid(op, format!("{name}: missing '{key}'")))
        };

        match name.as_str() {
            "write" => Ok(Op::Write(hex_arg(arg, "write")?)),
            "write_byte" => {
                let n = u64_arg(arg, "write_byte")?;
                let b = u8::try_from(n)
                    .map_err(|_| invalid(op, format!("write_byte: {n} is out of range 0..=255")))?;
                Ok(Op::WriteByte(b))
            }
            "write_int" => Ok(Op::WriteInt(u64_arg(arg, "write_int")?)),
            "write_index" => {
                let m = arg
                    .as_object()
                    .ok_or_else(|| invalid(op, "write_index must be an object"))?;
                let table_name = str_arg(&field(m, "table")?, "table")?;
                let table = IndexTable::from_name(&table_name)
                    .ok_or_else(|| invalid(op, format!("unknown table '{table_name}'")))?;
                let key = hex_arg(&field(m, "key")?, "key")?;
                Ok(Op::WriteIndex { table, key })
            }
            "end" => {
                let m = arg
                    .as_object()
                    .ok_or_else(|| invalid(op, "end must be an object"))?;
                let uncompressed = hex_arg(&field(m, "uncompressed")?, "uncompressed")?;
                let encode_type = str_arg(&field(m, "type")?, "type")?
                    .parse::<EncodeType>()
                    .map_err(|source| ReplayError::EncodeType { op, source })?;
                Ok(Op::End {
                    uncompressed,
                    encode_type,
                })
            }
            "snapshot" => Ok(Op::Snapshot(str_arg(arg, "snapshot")?)),
            "restore" => Ok(Op::Restore(str_arg(arg, "restore")?)),
            "discard" => Ok(Op::Discard),
            other => Err(invalid(op, format!("unknown operation '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// Parsed replay script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    ops: Vec<Op>,
}

/// Summary of a replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub committed_len: usize,
    pub pending_len: usize,
    pub stateless_flags: usize,
    pub storage_flags: usize,
    pub commits: usize,
    pub snapshots: usize,
    pub restores: usize,
}

impl ReplayReport {
    pub fn to_json(&self) -> Value {
        json!({
            "committed_len": self.committed_len,
            "pending_len": self.pending_len,
            "stateless_flags": self.stateless_flags,
            "storage_flags": self.storage_flags,
            "commits": self.commits,
            "snapshots": self.snapshots,
            "restores": self.restores,
        })
    }
}

impl Script {
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    /// Parse a script from JSON text.
    pub fn parse(text: &str) -> Result<Self, ReplayError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, ReplayError> {
        let items = value.as_array().ok_or(ReplayError::NotAnArray)?;
        let ops = items
            .iter()
            .enumerate()
            .map(|(i, v)| Op::parse(i, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ops })
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Apply every operation to `buf`, in order.
    ///
    /// Stops at the first failing operation; operations before it stay
    /// applied.
    pub fn run(&self, buf: &mut Buffer) -> Result<ReplayReport, ReplayError> {
        let mut snapshots: HashMap<String, Snapshot> = HashMap::new();
        let mut report = ReplayReport::default();

        for (i, op) in self.ops.iter().enumerate() {
            match op {
                Op::Write(bytes) => buf.write_bytes(bytes),
                Op::WriteByte(b) => buf.write_byte(*b),
                Op::WriteInt(n) => buf.write_int(*n),
                Op::WriteIndex { table, key } => {
                    let index = buf.refs().indexes().get(*table, key).ok_or_else(|| {
                        ReplayError::MissingIndex {
                            op: i,
                            table: table.name(),
                            key: hex::encode(key),
                        }
                    })?;
                    buf.write_int(index);
                }
                Op::End {
                    uncompressed,
                    encode_type,
                } => {
                    buf.end(uncompressed, *encode_type);
                    report.commits += 1;
                }
                Op::Snapshot(name) => {
                    snapshots.insert(name.clone(), buf.snapshot());
                    report.snapshots += 1;
                }
                Op::Restore(name) => {
                    let snap = snapshots
                        .get(name)
                        .cloned()
                        .ok_or_else(|| ReplayError::UnknownSnapshot {
                            op: i,
                            name: name.clone(),
                        })?;
                    buf.restore(snap);
                    report.restores += 1;
                }
                Op::Discard => buf.discard_pending(),
            }
        }

        report.committed_len = buf.len();
        report.pending_len = buf.pending_len();
        report.stateless_flags = buf.refs().flag_count(FlagNamespace::Stateless);
        report.storage_flags = buf.refs().flag_count(FlagNamespace::Storage);
        log::debug!("replayed {} ops: {report:?}", self.ops.len());
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::encoder::Indexes;

    fn buf() -> Buffer {
        let indexes = Indexes::new().with(IndexTable::Bytes4, [0xa9u8, 0x05, 0x9c, 0xbb], 2);
        Buffer::new(Arc::new(indexes), false)
    }

    #[test]
    fn parses_every_op() {
        let script = Script::parse(
            r#"[
                {"write": "0x0102"},
                {"write_byte": 255},
                {"write_int": 300},
                {"write_index": {"table": "bytes4", "key": "a9059cbb"}},
                {"end": {"uncompressed": "0x414243", "type": "stateless"}},
                {"snapshot": "s"},
                {"restore": "s"},
                {"discard": true}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            script.ops(),
            &[
                Op::Write(vec![1, 2]),
                Op::WriteByte(255),
                Op::WriteInt(300),
                Op::WriteIndex {
                    table: IndexTable::Bytes4,
                    key: vec![0xa9, 0x05, 0x9c, 0xbb],
                },
                Op::End {
                    uncompressed: b"ABC".to_vec(),
                    encode_type: EncodeType::Stateless,
                },
                Op::Snapshot("s".into()),
                Op::Restore("s".into()),
                Op::Discard,
            ]
        );
    }

    #[test]
    fn run_matches_direct_calls() {
        let script = Script::parse(
            r#"[
                {"write": "01020304"},
                {"end": {"uncompressed": "0x41424344", "type": "stateless"}},
                {"write_index": {"table": "bytes4", "key": "0xa9059cbb"}},
                {"write_int": 258},
                {"end": {"uncompressed": "0x00", "type": "write_storage"}}
            ]"#,
        )
        .unwrap();
        let mut replayed = buf();
        let report = script.run(&mut replayed).unwrap();

        let mut direct = Buffer::new(Arc::clone(replayed.refs().indexes()), false);
        direct.write_bytes(&[1, 2, 3, 4]);
        direct.end(b"ABCD", EncodeType::Stateless);
        direct.write_int(2);
        direct.write_int(258);
        direct.end(&[0], EncodeType::WriteStorage);

        assert_eq!(replayed.data(), direct.data());
        assert_eq!(replayed.refs(), direct.refs());
        assert_eq!(report.committed_len, 7);
        assert_eq!(report.commits, 2);
        assert_eq!(report.stateless_flags, 1);
        assert_eq!(report.storage_flags, 0);
    }

    #[test]
    fn restore_rolls_back_and_can_repeat() {
        let script = Script::parse(
            r#"[
                {"snapshot": "start"},
                {"write": "aa"},
                {"end": {"uncompressed": "0x616263", "type": "write_storage"}},
                {"restore": "start"},
                {"write": "bb"},
                {"end": {"uncompressed": "", "type": "read_storage"}},
                {"restore": "start"},
                {"write": "cc"}
            ]"#,
        )
        .unwrap();
        let mut b = buf();
        let report = script.run(&mut b).unwrap();
        assert_eq!(b.data(), &[0]);
        assert_eq!(b.pending(), &[0xcc]);
        assert_eq!(report.restores, 2);
        assert_eq!(report.snapshots, 1);
        assert_eq!(report.storage_flags, 0);
        assert_eq!(report.pending_len, 1);
    }

    #[test]
    fn errors_carry_op_position() {
        let err = Script::parse(r#"[{"write": "01"}, {"write": "zz"}]"#).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidHex { op: 1, .. }));

        let err = Script::parse(r#"[{"end": {"uncompressed": "", "type": "bogus"}}]"#)
            .unwrap_err();
        assert!(matches!(err, ReplayError::EncodeType { op: 0, .. }));

        let err = Script::parse(r#"[{"write_byte": 256}]"#).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidOp { op: 0, .. }));

        let err = Script::parse(r#"[{"write": "01", "discard": true}]"#).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidOp { op: 0, .. }));

        let err = Script::parse(r#"[{"jump": 1}]"#).unwrap_err();
        assert_eq!(err.to_string(), "op 0: unknown operation 'jump'");

        assert!(matches!(
            Script::parse(r#"{"write": "01"}"#),
            Err(ReplayError::NotAnArray)
        ));
    }

    #[test]
    fn run_errors() {
        let mut b = buf();
        let err = Script::parse(r#"[{"restore": "missing"}]"#)
            .unwrap()
            .run(&mut b)
            .unwrap_err();
        assert!(matches!(err, ReplayError::UnknownSnapshot { op: 0, .. }));

        let err = Script::parse(r#"[{"write_index": {"table": "address", "key": "0x01"}}]"#)
            .unwrap()
            .run(&mut b)
            .unwrap_err();
        assert_eq!(err.to_string(), "op 0: address table has no key 0x01");
    }

    #[test]
    fn report_json_fields() {
        let report = ReplayReport {
            committed_len: 5,
            commits: 1,
            ..Default::default()
        };
        let v = report.to_json();
        assert_eq!(v["committed_len"], 5);
        assert_eq!(v["commits"], 1);
        assert_eq!(v["restores"], 0);
    }
}
