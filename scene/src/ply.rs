//! PLY reading and writing for colored point clouds and triangle meshes.
//!
//! The reader understands the three standard encodings and picks the vertex
//! position, the vertex color and the face index list out of whatever else the
//! file carries. The writer produces `float` positions with `uchar` colors.

use std::io::Write;
use glam::Vec3;
use crate::cloud::{DEFAULT_FILL, PointCloud};
use crate::error::{Result, SceneError};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl PlyFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "ascii" => Some(Self::Ascii),
            "binary_little_endian" => Some(Self::BinaryLittleEndian),
            "binary_big_endian" => Some(Self::BinaryBigEndian),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::BinaryLittleEndian => "binary_little_endian",
            Self::BinaryBigEndian => "binary_big_endian",
        }
    }
}

/// Naming of the color properties. Blender's importer only maps
/// `diffuse_*` properties onto vertex colors.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ColorNaming {
    #[default]
    Standard,
    Diffuse,
}

impl ColorNaming {
    fn names(&self) -> [&'static str; 3] {
        match self {
            Self::Standard => ["red", "green", "blue"],
            Self::Diffuse => ["diffuse_red", "diffuse_green", "diffuse_blue"],
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "char" | "int8" => Some(Self::I8),
            "uchar" | "uint8" => Some(Self::U8),
            "short" | "int16" => Some(Self::I16),
            "ushort" | "uint16" => Some(Self::U16),
            "int" | "int32" => Some(Self::I32),
            "uint" | "uint32" => Some(Self::U32),
            "float" | "float32" => Some(Self::F32),
            "double" | "float64" => Some(Self::F64),
            _ => None,
        }
    }

    /// Scale that maps a stored color channel onto `[0, 1]`.
    fn color_scale(&self) -> f64 {
        match self {
            Self::F32 | Self::F64 => 1.0,
            Self::U16 | Self::I16 => 65535.0,
            _ => 255.0,
        }
    }
}

#[derive(Debug, Clone)]
enum Property {
    Scalar { name: String, ty: ScalarType },
    List { name: String, count_ty: ScalarType, item_ty: ScalarType },
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

#[derive(Debug)]
struct Header {
    format: PlyFormat,
    elements: Vec<Element>,
    body_offset: usize,
}

fn malformed(msg: impl Into<String>) -> SceneError {
    SceneError::Ply(msg.into())
}

fn scalar_type(name: &str) -> Result<ScalarType> {
    ScalarType::from_name(name).ok_or_else(|| malformed(format!("unknown property type '{name}'")))
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    if !bytes.starts_with(b"ply") {
        return Err(SceneError::UnsupportedFormat("missing 'ply' magic".into()));
    }

    let mut format = None;
    let mut elements: Vec<Element> = Vec::new();
    let mut offset = 0;

    loop {
        let rest = &bytes[offset..];
        let line_len = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| malformed("header is not terminated by 'end_header'"))?;
        let line = String::from_utf8_lossy(&rest[..line_len]);
        offset += line_len + 1;

        let mut words = line.split_whitespace();
        match words.next() {
            Some("ply") | Some("comment") | Some("obj_info") | None => {}
            Some("format") => {
                let name = words.next().unwrap_or_default();
                format = Some(
                    PlyFormat::from_name(name)
                        .ok_or_else(|| malformed(format!("unknown format '{name}'")))?,
                );
            }
            Some("element") => {
                let name = words
                    .next()
                    .ok_or_else(|| malformed("element without a name"))?
                    .to_string();
                let count = words
                    .next()
                    .and_then(|c| c.parse().ok())
                    .ok_or_else(|| malformed(format!("element '{name}' without a count")))?;
                elements.push(Element {
                    name,
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| malformed("property declared before any element"))?;
                let words: Vec<&str> = words.collect();
                let property = match words.as_slice() {
                    ["list", count_ty, item_ty, name] => Property::List {
                        name: name.to_string(),
                        count_ty: scalar_type(count_ty)?,
                        item_ty: scalar_type(item_ty)?,
                    },
                    [ty, name] => Property::Scalar {
                        name: name.to_string(),
                        ty: scalar_type(ty)?,
                    },
                    _ => return Err(malformed(format!("bad property line '{}'", line.trim()))),
                };
                element.properties.push(property);
            }
            Some("end_header") => break,
            Some(other) => return Err(malformed(format!("unexpected header keyword '{other}'"))),
        }
    }

    Ok(Header {
        format: format.ok_or_else(|| malformed("missing format line"))?,
        elements,
        body_offset: offset,
    })
}

trait BodyReader {
    fn read(&mut self, ty: ScalarType) -> Result<f64>;

    /// Upper bound on the number of values still in the body.
    fn remaining(&self) -> usize;
}

struct AsciiBody<'a> {
    text: &'a str,
    pos: usize,
}

impl BodyReader for AsciiBody<'_> {
    fn read(&mut self, _ty: ScalarType) -> Result<f64> {
        let rest = &self.text[self.pos..];
        let start = rest
            .find(|c: char| !c.is_ascii_whitespace())
            .ok_or_else(|| malformed("body ended before all elements were read"))?;
        let len = rest[start..]
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(rest.len() - start);
        let token = &rest[start..start + len];
        self.pos += start + len;
        token
            .parse()
            .map_err(|_| malformed(format!("'{token}' is not a number")))
    }

    fn remaining(&self) -> usize {
        // Every value takes at least one digit and one separator.
        (self.text.len() - self.pos).div_ceil(2)
    }
}

struct BinaryBody<'a> {
    bytes: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl BinaryBody<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| malformed("body ended before all elements were read"))?;
        self.pos = end;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        if !self.little_endian {
            buf.reverse();
        }
        Ok(buf)
    }
}

impl BodyReader for BinaryBody<'_> {
    fn read(&mut self, ty: ScalarType) -> Result<f64> {
        // Bytes are already in little-endian order after `take`.
        Ok(match ty {
            ScalarType::I8 => i8::from_le_bytes(self.take()?) as f64,
            ScalarType::U8 => u8::from_le_bytes(self.take()?) as f64,
            ScalarType::I16 => i16::from_le_bytes(self.take()?) as f64,
            ScalarType::U16 => u16::from_le_bytes(self.take()?) as f64,
            ScalarType::I32 => i32::from_le_bytes(self.take()?) as f64,
            ScalarType::U32 => u32::from_le_bytes(self.take()?) as f64,
            ScalarType::F32 => f32::from_le_bytes(self.take()?) as f64,
            ScalarType::F64 => f64::from_le_bytes(self.take()?),
        })
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }
}

#[derive(Debug, Copy, Clone)]
enum Slot {
    Position(usize),
    Color(usize, f64),
    Skip,
}

fn vertex_slots(element: &Element) -> Result<(Vec<Slot>, bool)> {
    let mut found_position = [false; 3];
    let mut found_color = [false; 3];
    let slots = element
        .properties
        .iter()
        .map(|property| {
            let Property::Scalar { name, ty } = property else {
                return Slot::Skip;
            };
            let slot = match name.as_str() {
                "x" => Slot::Position(0),
                "y" => Slot::Position(1),
                "z" => Slot::Position(2),
                "red" | "diffuse_red" | "r" => Slot::Color(0, ty.color_scale()),
                "green" | "diffuse_green" | "g" => Slot::Color(1, ty.color_scale()),
                "blue" | "diffuse_blue" | "b" => Slot::Color(2, ty.color_scale()),
                _ => Slot::Skip,
            };
            match slot {
                Slot::Position(axis) => found_position[axis] = true,
                Slot::Color(channel, _) => found_color[channel] = true,
                Slot::Skip => {}
            }
            slot
        })
        .collect();

    if found_position.contains(&false) {
        return Err(malformed("vertex element lacks one of x, y, z"));
    }
    Ok((slots, found_color.iter().all(|&c| c)))
}

/// Reads a list length and checks that the body can still hold that many values.
fn list_len(reader: &mut impl BodyReader, count_ty: ScalarType) -> Result<usize> {
    let count = reader.read(count_ty)?;
    if !(count >= 0.0 && count.fract() == 0.0) {
        return Err(malformed(format!("invalid list length {count}")));
    }
    if count > reader.remaining() as f64 {
        return Err(malformed(format!("list of {count} values exceeds the remaining body")));
    }
    Ok(count as usize)
}

fn skip_property(reader: &mut impl BodyReader, property: &Property) -> Result<()> {
    match property {
        Property::Scalar { ty, .. } => {
            reader.read(*ty)?;
        }
        Property::List { count_ty, item_ty, .. } => {
            let count = list_len(reader, *count_ty)?;
            for _ in 0..count {
                reader.read(*item_ty)?;
            }
        }
    }
    Ok(())
}

fn decode(header: &Header, reader: &mut impl BodyReader) -> Result<PointCloud> {
    let mut positions = Vec::new();
    let mut colors = Vec::new();
    let mut has_colors = false;
    let mut triangles: Option<Vec<[u32; 3]>> = None;
    let mut saw_vertices = false;

    for element in &header.elements {
        if element.properties.is_empty() && element.name != "vertex" {
            continue;
        }
        if element.count > reader.remaining() {
            return Err(malformed(format!(
                "{} {} elements exceed the remaining body",
                element.count, element.name
            )));
        }
        match element.name.as_str() {
            "vertex" => {
                saw_vertices = true;
                let (slots, with_colors) = vertex_slots(element)?;
                has_colors = with_colors;
                for _ in 0..element.count {
                    let mut position = [0.0f32; 3];
                    let mut color = [0.0f32; 3];
                    for (property, slot) in element.properties.iter().zip(&slots) {
                        match (property, slot) {
                            (Property::Scalar { ty, .. }, Slot::Position(axis)) => {
                                position[*axis] = reader.read(*ty)? as f32;
                            }
                            (Property::Scalar { ty, .. }, Slot::Color(channel, scale)) => {
                                color[*channel] = (reader.read(*ty)? / scale) as f32;
                            }
                            (property, _) => skip_property(reader, property)?,
                        }
                    }
                    positions.push(Vec3::from_array(position));
                    if with_colors {
                        colors.push(Vec3::from_array(color));
                    }
                }
            }
            "face" => {
                let faces = triangles.get_or_insert_with(Vec::new);
                for _ in 0..element.count {
                    for property in &element.properties {
                        match property {
                            Property::List { name, count_ty, item_ty }
                                if name == "vertex_indices" || name == "vertex_index" =>
                            {
                                let count = list_len(reader, *count_ty)?;
                                let mut polygon = Vec::with_capacity(count);
                                for _ in 0..count {
                                    polygon.push(reader.read(*item_ty)? as u32);
                                }
                                // Fan triangulation keeps quads and n-gons renderable.
                                for i in 1..polygon.len().saturating_sub(1) {
                                    faces.push([polygon[0], polygon[i], polygon[i + 1]]);
                                }
                            }
                            property => skip_property(reader, property)?,
                        }
                    }
                }
            }
            _ => {
                for _ in 0..element.count {
                    for property in &element.properties {
                        skip_property(reader, property)?;
                    }
                }
            }
        }
    }

    if !saw_vertices {
        return Err(malformed("no vertex element"));
    }

    let cloud = if has_colors {
        PointCloud::new(positions, colors)?
    } else {
        PointCloud::with_fill_color(positions, DEFAULT_FILL)
    };
    match triangles {
        Some(triangles) if !triangles.is_empty() => cloud.with_triangles(triangles),
        _ => Ok(cloud),
    }
}

/// Parses a PLY file held in memory.
pub fn read(bytes: &[u8]) -> Result<PointCloud> {
    let header = parse_header(bytes)?;
    let body = &bytes[header.body_offset..];
    match header.format {
        PlyFormat::Ascii => {
            let text = std::str::from_utf8(body)
                .map_err(|_| malformed("ascii body is not valid UTF-8"))?;
            decode(&header, &mut AsciiBody { text, pos: 0 })
        }
        PlyFormat::BinaryLittleEndian | PlyFormat::BinaryBigEndian => decode(
            &header,
            &mut BinaryBody {
                bytes: body,
                pos: 0,
                little_endian: header.format == PlyFormat::BinaryLittleEndian,
            },
        ),
    }
}

/// True when the bytes begin like a PLY file.
pub fn is_ply(bytes: &[u8]) -> bool {
    bytes.starts_with(b"ply\n") || bytes.starts_with(b"ply\r\n")
}

pub fn quantize(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub fn write<W: Write>(cloud: &PointCloud, format: PlyFormat, naming: ColorNaming, out: &mut W) -> Result<()> {
    let [red, green, blue] = naming.names();
    writeln!(out, "ply")?;
    writeln!(out, "format {} 1.0", format.name())?;
    writeln!(out, "element vertex {}", cloud.len())?;
    writeln!(out, "property float x")?;
    writeln!(out, "property float y")?;
    writeln!(out, "property float z")?;
    writeln!(out, "property uchar {red}")?;
    writeln!(out, "property uchar {green}")?;
    writeln!(out, "property uchar {blue}")?;
    if let Some(triangles) = cloud.triangles() {
        writeln!(out, "element face {}", triangles.len())?;
        writeln!(out, "property list uchar int vertex_indices")?;
    }
    writeln!(out, "end_header")?;

    let vertices = cloud.positions().iter().zip(cloud.colors());
    match format {
        PlyFormat::Ascii => {
            for (p, c) in vertices {
                writeln!(
                    out,
                    "{} {} {} {} {} {}",
                    p.x,
                    p.y,
                    p.z,
                    quantize(c.x),
                    quantize(c.y),
                    quantize(c.z)
                )?;
            }
            for [a, b, c] in cloud.triangles().unwrap_or_default() {
                writeln!(out, "3 {a} {b} {c}")?;
            }
        }
        PlyFormat::BinaryLittleEndian | PlyFormat::BinaryBigEndian => {
            let little = format == PlyFormat::BinaryLittleEndian;
            let f32_bytes = |v: f32| if little { v.to_le_bytes() } else { v.to_be_bytes() };
            let i32_bytes = |v: i32| if little { v.to_le_bytes() } else { v.to_be_bytes() };
            for (p, c) in vertices {
                for v in p.to_array() {
                    out.write_all(&f32_bytes(v))?;
                }
                out.write_all(&[quantize(c.x), quantize(c.y), quantize(c.z)])?;
            }
            for triangle in cloud.triangles().unwrap_or_default() {
                out.write_all(&[3u8])?;
                for &index in triangle {
                    out.write_all(&i32_bytes(index as i32))?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}
