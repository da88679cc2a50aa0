use crate::CloudPoint;
use ply_rs::{
    ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
        ScalarType,
    },
    writer::Writer,
};
use std::io::{self, Write};

/// Writes the point cloud as an ASCII PLY file with `x y z intensity` vertices.
pub fn write_ply(mut writer: impl Write, points: &[CloudPoint]) -> io::Result<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;
    ply.header
        .comments
        .push("Exported from emvs-mapper".to_string());

    let mut point_element = ElementDef::new("vertex".to_string());
    for name in ["x", "y", "z", "intensity"] {
        let p = PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::Double));
        point_element.properties.add(p);
    }
    ply.header.elements.add(point_element);

    let vertices = points
        .iter()
        .map(|p| {
            let mut vertex = DefaultElement::new();
            vertex.insert("x".to_string(), Property::Double(p.position.x));
            vertex.insert("y".to_string(), Property::Double(p.position.y));
            vertex.insert("z".to_string(), Property::Double(p.position.z));
            vertex.insert("intensity".to_string(), Property::Double(p.intensity));
            vertex
        })
        .collect();
    ply.payload.insert("vertex".to_string(), vertices);

    let w = Writer::new();
    w.write_ply(&mut writer, &mut ply)?;
    Ok(())
}
