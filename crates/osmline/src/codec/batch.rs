//! Columnar batch encoding/decoding.
//!
//! A batch is the magic, a version byte and three tables (nodes, ways,
//! relations). Each table is a row count followed by its columns, one
//! column after another:
//!
//! ```text
//! id         zigzag varint delta from the previous row (first row from 0)
//! user       presence byte, string
//! uid        presence byte, zigzag varint
//! visible    0/1 byte
//! version    presence byte, zigzag varint
//! changeset  presence byte, zigzag varint
//! timestamp  presence byte, string
//! tags       count, then key/value strings sorted by key
//! ```
//!
//! Nodes then carry `lat` and `lon` columns (f64 LE), ways a node-reference
//! list per row, relations a role/reference member list per row.

use std::io::Read;

use crate::codec::primitives::{Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{
    FORMAT_VERSION, MAGIC_COMPRESSED, MAGIC_UNCOMPRESSED, MAX_BATCH_SIZE, MAX_MEMBERS_PER_RECORD,
    MAX_ROWS_PER_TABLE, MAX_STRING_LEN, MAX_TAGS_PER_RECORD, MIN_FORMAT_VERSION,
};
use crate::model::{Member, Metadata, Node, RecordBatch, Relation, Way};

// =============================================================================
// DECODING
// =============================================================================

/// Decompresses an OSMBZ batch, returning the uncompressed OSMB bytes.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if input.len() < MAGIC_COMPRESSED.len() {
        return Err(DecodeError::UnexpectedEof { context: "magic" });
    }
    if &input[..5] != MAGIC_COMPRESSED {
        return Err(invalid_magic(input));
    }
    decompress_zstd(&input[5..])
}

/// Decodes a batch, compressed or not.
pub fn decode_batch(input: &[u8]) -> Result<RecordBatch, DecodeError> {
    if input.len() < MAGIC_UNCOMPRESSED.len() {
        return Err(DecodeError::UnexpectedEof { context: "magic" });
    }

    if input.starts_with(MAGIC_COMPRESSED) {
        let decompressed = decompress_zstd(&input[5..])?;
        if !decompressed.starts_with(MAGIC_UNCOMPRESSED) {
            return Err(invalid_magic(&decompressed));
        }
        decode_uncompressed(&decompressed)
    } else if input.starts_with(MAGIC_UNCOMPRESSED) {
        decode_uncompressed(input)
    } else {
        Err(invalid_magic(input))
    }
}

fn decode_uncompressed(input: &[u8]) -> Result<RecordBatch, DecodeError> {
    if input.len() > MAX_BATCH_SIZE {
        return Err(DecodeError::LengthExceedsLimit {
            field: "batch",
            len: input.len(),
            max: MAX_BATCH_SIZE,
        });
    }

    let mut reader = Reader::new(input);
    reader.read_bytes(MAGIC_UNCOMPRESSED.len(), "magic")?;
    let version = reader.read_byte("version")?;
    if !(MIN_FORMAT_VERSION..=FORMAT_VERSION).contains(&version) {
        return Err(DecodeError::UnsupportedVersion { version });
    }

    let nodes = decode_nodes(&mut reader)?;
    let ways = decode_ways(&mut reader)?;
    let relations = decode_relations(&mut reader)?;

    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes {
            len: reader.remaining().len(),
        });
    }

    Ok(RecordBatch {
        nodes,
        ways,
        relations,
    })
}

fn decode_nodes(reader: &mut Reader<'_>) -> Result<Vec<Node>, DecodeError> {
    let rows = reader.read_len(MAX_ROWS_PER_TABLE, "node_count")?;
    let metas = read_metadata(reader, rows)?;

    let mut lats = Vec::with_capacity(rows);
    for _ in 0..rows {
        lats.push(reader.read_f64("lat")?);
    }
    let mut nodes = Vec::with_capacity(rows);
    for (meta, lat) in metas.into_iter().zip(lats) {
        let lon = reader.read_f64("lon")?;
        nodes.push(Node { meta, lat, lon });
    }
    Ok(nodes)
}

fn decode_ways(reader: &mut Reader<'_>) -> Result<Vec<Way>, DecodeError> {
    let rows = reader.read_len(MAX_ROWS_PER_TABLE, "way_count")?;
    let metas = read_metadata(reader, rows)?;

    let mut ways = Vec::with_capacity(rows);
    for meta in metas {
        let count = reader.read_len(MAX_MEMBERS_PER_RECORD, "way_nodes")?;
        let mut nodes = Vec::with_capacity(count.min(reader.remaining().len()));
        for _ in 0..count {
            nodes.push(reader.read_string(MAX_STRING_LEN, "node_ref")?);
        }
        ways.push(Way { meta, nodes });
    }
    Ok(ways)
}

fn decode_relations(reader: &mut Reader<'_>) -> Result<Vec<Relation>, DecodeError> {
    let rows = reader.read_len(MAX_ROWS_PER_TABLE, "relation_count")?;
    let metas = read_metadata(reader, rows)?;

    let mut relations = Vec::with_capacity(rows);
    for meta in metas {
        let count = reader.read_len(MAX_MEMBERS_PER_RECORD, "members")?;
        let mut members = Vec::with_capacity(count.min(reader.remaining().len()));
        for _ in 0..count {
            let role = reader.read_string(MAX_STRING_LEN, "role")?;
            let reference = reader.read_string(MAX_STRING_LEN, "member_ref")?;
            members.push(Member { role, reference });
        }
        relations.push(Relation { meta, members });
    }
    Ok(relations)
}

fn read_metadata(reader: &mut Reader<'_>, rows: usize) -> Result<Vec<Metadata>, DecodeError> {
    // Every row costs at least one byte per column, so a row count larger
    // than the remaining input is already a truncated batch.
    if rows > reader.remaining().len() {
        return Err(DecodeError::UnexpectedEof { context: "rows" });
    }

    let mut metas = Vec::with_capacity(rows);
    let mut id: i64 = 0;
    for _ in 0..rows {
        id = id.wrapping_add(reader.read_signed_varint("id")?);
        metas.push(Metadata::new(id));
    }

    for meta in &mut metas {
        meta.user = read_optional(reader, "user", |r| r.read_string(MAX_STRING_LEN, "user"))?;
    }
    for meta in &mut metas {
        meta.uid = read_optional(reader, "uid", |r| r.read_signed_varint("uid"))?;
    }
    for meta in &mut metas {
        meta.visible = reader.read_flag("visible")?;
    }
    for meta in &mut metas {
        meta.version = read_optional(reader, "version", |r| {
            let value = r.read_signed_varint("version")?;
            i32::try_from(value).map_err(|_| DecodeError::ValueOutOfRange {
                field: "version",
                value,
            })
        })?;
    }
    for meta in &mut metas {
        meta.changeset = read_optional(reader, "changeset", |r| r.read_signed_varint("changeset"))?;
    }
    for meta in &mut metas {
        meta.timestamp = read_optional(reader, "timestamp", |r| {
            r.read_string(MAX_STRING_LEN, "timestamp")
        })?;
    }
    for meta in &mut metas {
        let count = reader.read_len(MAX_TAGS_PER_RECORD, "tags")?;
        for _ in 0..count {
            let key = reader.read_string(MAX_STRING_LEN, "tag_key")?;
            let value = reader.read_string(MAX_STRING_LEN, "tag_value")?;
            meta.tags.insert(key, value);
        }
    }

    Ok(metas)
}

fn read_optional<'a, T>(
    reader: &mut Reader<'a>,
    field: &'static str,
    read: impl FnOnce(&mut Reader<'a>) -> Result<T, DecodeError>,
) -> Result<Option<T>, DecodeError> {
    if reader.read_flag(field)? {
        read(reader).map(Some)
    } else {
        Ok(None)
    }
}

fn invalid_magic(input: &[u8]) -> DecodeError {
    let mut found = [0u8; 4];
    let n = input.len().min(4);
    found[..n].copy_from_slice(&input[..n]);
    DecodeError::InvalidMagic { found }
}

fn decompress_zstd(compressed: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut reader = Reader::new(compressed);
    let declared_size = reader.read_len(MAX_BATCH_SIZE, "uncompressed_size")?;

    let mut decoder = zstd::Decoder::new(reader.remaining())
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;

    // Read one byte past the declared size so an oversized payload is caught
    // without inflating it fully.
    let mut decompressed = Vec::with_capacity(declared_size);
    (&mut decoder)
        .take(declared_size as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;

    if decompressed.len() != declared_size {
        return Err(DecodeError::UncompressedSizeMismatch {
            declared: declared_size,
            actual: decompressed.len(),
        });
    }

    Ok(decompressed)
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a batch without compression.
pub fn encode_batch(batch: &RecordBatch) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::with_capacity(64 + batch.len() * 32);
    writer.write_bytes(MAGIC_UNCOMPRESSED);
    writer.write_byte(FORMAT_VERSION);

    encode_nodes(&mut writer, &batch.nodes)?;
    encode_ways(&mut writer, &batch.ways)?;
    encode_relations(&mut writer, &batch.relations)?;

    if writer.len() > MAX_BATCH_SIZE {
        return Err(EncodeError::LengthExceedsLimit {
            field: "batch",
            len: writer.len(),
            max: MAX_BATCH_SIZE,
        });
    }
    Ok(writer.into_bytes())
}

/// Encodes a batch with zstd compression at `level`.
pub fn encode_batch_compressed(batch: &RecordBatch, level: i32) -> Result<Vec<u8>, EncodeError> {
    let uncompressed = encode_batch(batch)?;

    let compressed = zstd::encode_all(uncompressed.as_slice(), level)
        .map_err(|e| EncodeError::CompressionFailed(e.to_string()))?;

    let mut writer = Writer::with_capacity(5 + 10 + compressed.len());
    writer.write_bytes(MAGIC_COMPRESSED);
    writer.write_varint(uncompressed.len() as u64);
    writer.write_bytes(&compressed);

    Ok(writer.into_bytes())
}

fn encode_nodes(writer: &mut Writer, nodes: &[Node]) -> Result<(), EncodeError> {
    check_len("node_count", nodes.len(), MAX_ROWS_PER_TABLE)?;
    if let Some(node) = nodes.iter().find(|n| n.lat.is_nan() || n.lon.is_nan()) {
        return Err(EncodeError::FloatIsNan { id: node.meta.id });
    }

    writer.write_varint(nodes.len() as u64);
    let metas: Vec<&Metadata> = nodes.iter().map(|n| &n.meta).collect();
    write_metadata(writer, &metas)?;
    for node in nodes {
        writer.write_f64(node.lat);
    }
    for node in nodes {
        writer.write_f64(node.lon);
    }
    Ok(())
}

fn encode_ways(writer: &mut Writer, ways: &[Way]) -> Result<(), EncodeError> {
    check_len("way_count", ways.len(), MAX_ROWS_PER_TABLE)?;

    writer.write_varint(ways.len() as u64);
    let metas: Vec<&Metadata> = ways.iter().map(|w| &w.meta).collect();
    write_metadata(writer, &metas)?;
    for way in ways {
        check_len("way_nodes", way.nodes.len(), MAX_MEMBERS_PER_RECORD)?;
        writer.write_varint(way.nodes.len() as u64);
        for node in &way.nodes {
            write_text(writer, "node_ref", node)?;
        }
    }
    Ok(())
}

fn encode_relations(writer: &mut Writer, relations: &[Relation]) -> Result<(), EncodeError> {
    check_len("relation_count", relations.len(), MAX_ROWS_PER_TABLE)?;

    writer.write_varint(relations.len() as u64);
    let metas: Vec<&Metadata> = relations.iter().map(|r| &r.meta).collect();
    write_metadata(writer, &metas)?;
    for relation in relations {
        check_len("members", relation.members.len(), MAX_MEMBERS_PER_RECORD)?;
        writer.write_varint(relation.members.len() as u64);
        for member in &relation.members {
            write_text(writer, "role", &member.role)?;
            write_text(writer, "member_ref", &member.reference)?;
        }
    }
    Ok(())
}

fn write_metadata(writer: &mut Writer, metas: &[&Metadata]) -> Result<(), EncodeError> {
    let mut prev: i64 = 0;
    for meta in metas {
        writer.write_signed_varint(meta.id.wrapping_sub(prev));
        prev = meta.id;
    }

    for meta in metas {
        write_optional(writer, meta.user.as_deref(), |w, user| write_text(w, "user", user))?;
    }
    for meta in metas {
        write_optional(writer, meta.uid, |w, uid| {
            w.write_signed_varint(uid);
            Ok(())
        })?;
    }
    for meta in metas {
        writer.write_flag(meta.visible);
    }
    for meta in metas {
        write_optional(writer, meta.version, |w, version| {
            w.write_signed_varint(i64::from(version));
            Ok(())
        })?;
    }
    for meta in metas {
        write_optional(writer, meta.changeset, |w, changeset| {
            w.write_signed_varint(changeset);
            Ok(())
        })?;
    }
    for meta in metas {
        write_optional(writer, meta.timestamp.as_deref(), |w, ts| {
            write_text(w, "timestamp", ts)
        })?;
    }
    for meta in metas {
        check_len("tags", meta.tags.len(), MAX_TAGS_PER_RECORD)?;
        let mut tags: Vec<(&String, &String)> = meta.tags.iter().collect();
        tags.sort_unstable_by(|a, b| a.0.cmp(b.0));

        writer.write_varint(tags.len() as u64);
        for (key, value) in tags {
            write_text(writer, "tag_key", key)?;
            write_text(writer, "tag_value", value)?;
        }
    }
    Ok(())
}

fn write_optional<T>(
    writer: &mut Writer,
    value: Option<T>,
    write: impl FnOnce(&mut Writer, T) -> Result<(), EncodeError>,
) -> Result<(), EncodeError> {
    match value {
        Some(value) => {
            writer.write_flag(true);
            write(writer, value)
        }
        None => {
            writer.write_flag(false);
            Ok(())
        }
    }
}

fn write_text(writer: &mut Writer, field: &'static str, s: &str) -> Result<(), EncodeError> {
    check_len(field, s.len(), MAX_STRING_LEN)?;
    writer.write_string(s);
    Ok(())
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<(), EncodeError> {
    if len > max {
        return Err(EncodeError::LengthExceedsLimit { field, len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use pretty_assertions::assert_eq;

    fn make_test_batch() -> RecordBatch {
        let mut cafe = Node::new(2, 48.8566, 2.3522);
        cafe.meta.user = Some("mapper".to_string());
        cafe.meta.uid = Some(42);
        cafe.meta.version = Some(3);
        cafe.meta.changeset = Some(1_000_001);
        cafe.meta.timestamp = Some("2024-01-01T00:00:00Z".to_string());
        cafe.meta.insert_tag("name", "Café");
        cafe.meta.insert_tag("amenity", "cafe");

        let mut origin = Node::new(-5, 0.0, -0.0);
        origin.meta.visible = false;
        origin.meta.version = Some(-1);

        let mut way = Way::new(9);
        way.push_node("N2".to_string());
        way.push_node("N-5".to_string());
        way.push_node("N2".to_string());
        way.meta.insert_tag("highway", "service");

        let mut relation = Relation::new(20);
        relation.push_member("outer", "W9".to_string());
        relation.push_member("", "N2".to_string());

        RecordBatch {
            nodes: vec![cafe, origin, Node::new(i64::MAX, 90.0, 180.0)],
            ways: vec![way],
            relations: vec![relation],
        }
    }

    #[test]
    fn test_batch_roundtrip() {
        let batch = make_test_batch();

        let encoded = encode_batch(&batch).unwrap();
        let decoded = decode_batch(&encoded).unwrap();

        assert_eq!(decoded, batch);
    }

    #[test]
    fn test_batch_compressed_roundtrip() {
        let batch = make_test_batch();

        let encoded = encode_batch_compressed(&batch, 3).unwrap();
        assert_eq!(decode_batch(&encoded).unwrap(), batch);
        assert_eq!(decompress(&encoded).unwrap(), encode_batch(&batch).unwrap());
    }

    #[test]
    fn test_compression_magic() {
        let batch = make_test_batch();

        let uncompressed = encode_batch(&batch).unwrap();
        let compressed = encode_batch_compressed(&batch, 3).unwrap();

        assert_eq!(&uncompressed[0..4], b"OSMB");
        assert_eq!(uncompressed[4], FORMAT_VERSION);
        assert_eq!(&compressed[0..5], b"OSMBZ");
    }

    #[test]
    fn test_empty_batch() {
        let encoded = encode_batch(&RecordBatch::new()).unwrap();
        assert_eq!(encoded, vec![b'O', b'S', b'M', b'B', FORMAT_VERSION, 0, 0, 0]);
        assert!(decode_batch(&encoded).unwrap().is_empty());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        // Tag maps iterate in arbitrary order; output must not.
        let mut a = Node::new(1, 1.0, 1.0);
        let mut b = Node::new(1, 1.0, 1.0);
        for (k, v) in [("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")] {
            a.meta.insert_tag(k, v);
        }
        for (k, v) in [("d", "4"), ("c", "3"), ("b", "2"), ("a", "1")] {
            b.meta.insert_tag(k, v);
        }
        let a = RecordBatch::from_iter([Record::Node(a)]);
        let b = RecordBatch::from_iter([Record::Node(b)]);
        assert_eq!(encode_batch(&a).unwrap(), encode_batch(&b).unwrap());
    }

    #[test]
    fn test_invalid_magic() {
        let result = decode_batch(b"XXXX");
        assert_eq!(result, Err(DecodeError::InvalidMagic { found: *b"XXXX" }));
        assert_eq!(
            decompress(b"OSMB\x01"),
            Err(DecodeError::InvalidMagic { found: *b"OSMB" })
        );
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC_UNCOMPRESSED);
        data.push(99);
        data.extend_from_slice(&[0u8; 3]);

        let result = decode_batch(&data);
        assert_eq!(result, Err(DecodeError::UnsupportedVersion { version: 99 }));
    }

    #[test]
    fn test_truncated_batch() {
        let encoded = encode_batch(&make_test_batch()).unwrap();
        for cut in [5, 6, encoded.len() / 2, encoded.len() - 1] {
            assert!(
                matches!(decode_batch(&encoded[..cut]), Err(DecodeError::UnexpectedEof { .. })),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut encoded = encode_batch(&RecordBatch::new()).unwrap();
        encoded.extend_from_slice(&[7, 7]);
        assert_eq!(decode_batch(&encoded), Err(DecodeError::TrailingBytes { len: 2 }));
    }

    #[test]
    fn test_huge_row_count_rejected() {
        let mut w = Writer::new();
        w.write_bytes(MAGIC_UNCOMPRESSED);
        w.write_byte(FORMAT_VERSION);
        w.write_varint(MAX_ROWS_PER_TABLE as u64 + 1);
        assert!(matches!(
            decode_batch(w.as_bytes()),
            Err(DecodeError::LengthExceedsLimit { field: "node_count", .. })
        ));
    }

    #[test]
    fn test_bad_presence_flag() {
        // One node, id 1, then a user presence byte of 2.
        let data = [b'O', b'S', b'M', b'B', FORMAT_VERSION, 1, 2, 2, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            decode_batch(&data),
            Err(DecodeError::InvalidFlag { field: "user", value: 2 })
        );
    }

    #[test]
    fn test_version_out_of_range() {
        let mut w = Writer::new();
        w.write_bytes(MAGIC_UNCOMPRESSED);
        w.write_byte(FORMAT_VERSION);
        w.write_varint(1); // one node
        w.write_signed_varint(1); // id
        w.write_flag(false); // user
        w.write_flag(false); // uid
        w.write_flag(true); // visible
        w.write_flag(true); // version present
        w.write_signed_varint(i64::from(i32::MIN) - 1);
        w.write_bytes(&[0; 32]);

        assert_eq!(
            decode_batch(w.as_bytes()),
            Err(DecodeError::ValueOutOfRange {
                field: "version",
                value: i64::from(i32::MIN) - 1,
            })
        );
    }

    #[test]
    fn test_nan_coordinate_rejected() {
        let batch = RecordBatch::from_iter([Record::Node(Node::new(7, f64::NAN, 0.0))]);
        assert_eq!(encode_batch(&batch), Err(EncodeError::FloatIsNan { id: 7 }));
    }

    #[test]
    fn test_long_string_rejected() {
        let mut node = Node::new(1, 0.0, 0.0);
        node.meta.insert_tag("note", "x".repeat(MAX_STRING_LEN + 1));
        let batch = RecordBatch::from_iter([Record::Node(node)]);
        assert!(matches!(
            encode_batch(&batch),
            Err(EncodeError::LengthExceedsLimit { field: "tag_value", .. })
        ));
    }

    #[test]
    fn test_compressed_size_mismatch() {
        let encoded = encode_batch_compressed(&make_test_batch(), 3).unwrap();

        // Rewrite the declared size to something smaller.
        let mut reader = Reader::new(&encoded[5..]);
        let declared = reader.read_varint("size").unwrap();
        let mut tampered = Writer::new();
        tampered.write_bytes(MAGIC_COMPRESSED);
        tampered.write_varint(declared - 1);
        tampered.write_bytes(reader.remaining());

        assert!(matches!(
            decode_batch(tampered.as_bytes()),
            Err(DecodeError::UncompressedSizeMismatch { .. })
        ));
    }
}
