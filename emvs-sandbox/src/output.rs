use emvs_mapper::{write_ply, CloudPoint, DepthMap};
use log::*;
use std::error::Error;
use std::path::Path;

/// Writes the colored and gray depth, confidence and mask layers of `depth_map` as PNG files into `directory`.
pub fn save_depth_map(
    directory: &Path,
    depth_map: &DepthMap,
    min_depth: f32,
    max_depth: f32,
) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(directory)?;
    let colored = directory.join("depth_colored.png");
    depth_map
        .depth_colored_image(min_depth, max_depth)
        .save(&colored)?;
    info!("wrote {}", colored.display());
    let images = [
        ("depth_map.png", depth_map.depth_image(min_depth, max_depth)),
        ("confidence_map.png", depth_map.confidence_image()),
        ("semidense_mask.png", depth_map.mask_image()),
    ];
    for (name, image) in images {
        let path = directory.join(name);
        image.save(&path)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

pub fn save_point_cloud(path: &Path, cloud: &[CloudPoint]) -> Result<(), Box<dyn Error>> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_ply(file, cloud)?;
    info!("wrote {} points to {}", cloud.len(), path.display());
    Ok(())
}
