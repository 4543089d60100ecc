// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stream encoder
//!
//! Mirror of [`StreamReader`](crate::reader::StreamReader): the same
//! little-endian layout and the same frame-relative alignment, padded with
//! zeros. Record writers append the discriminant, the fields and the trailing
//! 8-byte alignment the server's encoder always emits.
//!
//! ```rust,ignore
//! use ifc_stream_core::{FrameType, StreamWriter};
//!
//! let mut frame = StreamWriter::frame(42, FrameType::Data);
//! frame.write_header(16, Some(1.0), &boundary);
//! frame.write_end();
//! let bytes = frame.into_bytes();
//! ```

use crate::frame::FrameType;
use crate::mesh::{Mesh, ModelBoundary};
use crate::record::{
    GeometryRecord, MinimalObjectRecord, MultiPartGeometryRecord, ObjectRecord, RecordKind,
    StreamHeader, MAGIC,
};

/// Growable little-endian byte buffer
#[derive(Debug, Clone, Default)]
pub struct StreamWriter {
    buf: Vec<u8>,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a frame: topic id and frame type envelope
    pub fn frame(topic_id: u64, frame_type: FrameType) -> Self {
        let mut writer = Self::new();
        writer.write_u64(topic_id);
        writer.write_u64(frame_type.as_u64());
        writer
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_byte(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Low word first, then high word
    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&(value as u32).to_le_bytes());
        self.buf.extend_from_slice(&((value >> 32) as u32).to_le_bytes());
    }

    /// i16 byte length followed by the UTF-8 bytes
    ///
    /// # Panics
    ///
    /// Panics if the string is longer than `i16::MAX` bytes.
    pub fn write_utf8(&mut self, value: &str) {
        let len = i16::try_from(value.len()).expect("string longer than i16::MAX bytes");
        self.write_i16(len);
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_f32_slice(&mut self, values: &[f32]) {
        for v in values {
            self.write_f32(*v);
        }
    }

    pub fn write_f64_slice(&mut self, values: &[f64]) {
        for v in values {
            self.write_f64(*v);
        }
    }

    pub fn align4(&mut self) {
        self.pad_to(4);
    }

    pub fn align8(&mut self) {
        self.pad_to(8);
    }

    fn pad_to(&mut self, boundary: usize) {
        let rem = self.buf.len() % boundary;
        if rem != 0 {
            self.buf.resize(self.buf.len() + boundary - rem, 0);
        }
    }

    fn write_count(&mut self, count: usize) {
        self.write_i32(i32::try_from(count).expect("element count exceeds i32::MAX"));
    }

    fn write_indices(&mut self, indices: &[u32]) {
        self.write_count(indices.len());
        for &i in indices {
            self.write_i16(i as u16 as i16);
        }
        self.align4();
    }

    fn write_buffers(&mut self, mesh: &Mesh) {
        self.write_count(mesh.positions.len());
        self.write_f32_slice(&mesh.positions);
        self.write_count(mesh.normals.len());
        self.write_f32_slice(&mesh.normals);
    }

    /// Stream header record. `scale_factor` is written only for versions above 15.
    pub fn write_header(&mut self, version: u8, scale_factor: Option<f32>, boundary: &ModelBoundary) {
        self.write_byte(RecordKind::Header.as_u8());
        self.write_utf8(MAGIC);
        self.write_byte(version);
        if version > crate::record::LAST_VERSION_WITHOUT_SCALE {
            self.write_f32(scale_factor.unwrap_or(1.0));
        }
        self.align8();
        self.write_f64_slice(&boundary.to_aabb());
        self.align8();
    }

    pub fn write_stream_header(&mut self, header: &StreamHeader) {
        self.write_header(header.version, header.scale_factor, &header.boundary);
    }

    pub fn write_geometry(&mut self, record: &GeometryRecord) {
        self.write_byte(RecordKind::Geometry.as_u8());
        self.write_i32(record.reuse_count);
        self.align8();
        self.write_u64(record.geometry_id);
        self.write_indices(&record.mesh.indices);
        match record.color {
            Some(color) => {
                self.write_i32(1);
                self.write_f32_slice(&color);
            }
            None => self.write_i32(0),
        }
        self.write_buffers(&record.mesh);
        self.align8();
    }

    pub fn write_object(&mut self, record: &ObjectRecord) {
        self.write_byte(RecordKind::Object.as_u8());
        self.write_utf8(&record.ifc_type);
        self.write_byte(u8::from(record.transparent));
        self.align8();
        self.write_u64(record.geometry_info_id);
        self.write_u64(record.geometry_id);
        self.write_f64_slice(record.matrix.as_slice());
        self.align8();
    }

    pub fn write_minimal_object(&mut self, record: &MinimalObjectRecord) {
        self.write_byte(RecordKind::MinimalObject.as_u8());
        self.write_utf8(&record.ifc_type);
        self.align8();
        self.write_u64(record.geometry_info_id);
        self.write_u64(record.geometry_id);
        self.align8();
    }

    pub fn write_multi_part_geometry(&mut self, record: &MultiPartGeometryRecord) {
        self.write_byte(RecordKind::MultiPartGeometry.as_u8());
        self.write_i32(record.reuse_count);
        self.align8();
        self.write_u64(record.geometry_id);
        self.write_count(record.parts.len());
        for part in &record.parts {
            self.align8();
            self.write_u64(part.part_id);
            self.write_indices(&part.mesh.indices);
            self.write_buffers(&part.mesh);
        }
        self.align8();
    }

    pub fn write_end(&mut self) {
        self.write_byte(RecordKind::End.as_u8());
        self.align8();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::StreamReader;
    use crate::record::{GeometryPart, Record};
    use nalgebra::Matrix4;

    #[test]
    fn test_padding_keeps_records_on_8_byte_boundaries() {
        let mut w = StreamWriter::frame(1, FrameType::Data);
        assert_eq!(w.len(), 16);
        w.write_end();
        assert_eq!(w.len(), 24);
        w.write_object(&ObjectRecord {
            geometry_info_id: 5,
            ifc_type: "IfcWall".into(),
            transparent: false,
            geometry_id: 6,
            matrix: Matrix4::identity(),
        });
        assert_eq!(w.len() % 8, 0);
    }

    #[test]
    fn test_u64_written_as_two_words() {
        let mut w = StreamWriter::new();
        w.write_u64((7u64 << 32) | 9);
        assert_eq!(w.into_bytes(), vec![9, 0, 0, 0, 7, 0, 0, 0]);
    }

    #[test]
    fn test_object_matrix_is_column_major() {
        let matrix = Matrix4::new(
            1.0, 0.0, 0.0, 10.0, //
            0.0, 1.0, 0.0, 20.0, //
            0.0, 0.0, 1.0, 30.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        let record = ObjectRecord {
            geometry_info_id: 100,
            ifc_type: "IfcColumn".into(),
            transparent: true,
            geometry_id: 200,
            matrix,
        };
        let mut w = StreamWriter::new();
        w.write_object(&record);
        let bytes = w.into_bytes();

        // kind, "IfcColumn" (2 + 9), transparency, pad to 16, two ids, then the matrix
        let translation_x = &bytes[32 + 12 * 8..32 + 13 * 8];
        assert_eq!(translation_x, &10.0f64.to_le_bytes());

        let mut reader = StreamReader::new(&bytes);
        assert_eq!(Record::decode(&mut reader).unwrap(), Record::Object(record));
    }

    #[test]
    fn test_stream_header_decodes() {
        for (version, scale_factor) in [(11u8, None), (16, Some(0.001f32))] {
            let header = StreamHeader {
                version,
                scale_factor,
                boundary: ModelBoundary::from_aabb([-1.0, -2.0, -3.0, 4.0, 5.0, 6.0]),
            };
            let mut w = StreamWriter::new();
            w.write_stream_header(&header);
            let bytes = w.into_bytes();
            assert_eq!(bytes.len() % 8, 0);
            let mut reader = StreamReader::new(&bytes);
            assert_eq!(Record::decode(&mut reader).unwrap(), Record::Header(header));
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn test_minimal_object_decodes() {
        let record = MinimalObjectRecord {
            ifc_type: "IfcFurnishingElement".into(),
            geometry_info_id: 31,
            geometry_id: 32,
        };
        let mut w = StreamWriter::new();
        w.write_minimal_object(&record);
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 9);
        let mut reader = StreamReader::new(&bytes);
        assert_eq!(
            Record::decode(&mut reader).unwrap(),
            Record::MinimalObject(record)
        );
        reader.align8().unwrap();
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_multi_part_geometry_decodes() {
        let record = MultiPartGeometryRecord {
            geometry_id: 77,
            reuse_count: 1,
            parts: vec![
                GeometryPart {
                    part_id: 1,
                    mesh: Mesh::from_parts(vec![0.0; 9], vec![1.0; 9], vec![0, 1, 2]),
                },
                GeometryPart {
                    part_id: 2,
                    mesh: Mesh::from_parts(vec![2.0; 3], vec![], vec![0]),
                },
            ],
        };
        let mut w = StreamWriter::new();
        w.write_multi_part_geometry(&record);
        let bytes = w.into_bytes();
        let mut reader = StreamReader::new(&bytes);
        assert_eq!(
            Record::decode(&mut reader).unwrap(),
            Record::MultiPartGeometry(record)
        );
        reader.align8().unwrap();
        assert_eq!(reader.remaining(), 0);
    }
}
