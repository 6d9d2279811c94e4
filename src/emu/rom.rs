use std::path::Path;

use super::{Chip8Error, MAX_ROM_SIZE};

/// Reads a `.ch8` program image from disk.
///
/// Oversized files are rejected here already, so a driver can report them
/// before touching the machine.
pub fn read_image(path: impl AsRef<Path>) -> Result<Vec<u8>, Chip8Error> {
    let path = path.as_ref();
    let image = std::fs::read(path).map_err(|source| Chip8Error::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    if image.len() > MAX_ROM_SIZE {
        return Err(Chip8Error::ImageTooLarge {
            size: image.len(),
            max_size: MAX_ROM_SIZE,
        });
    }

    log::info!("Read {} byte image from {}", image.len(), path.display());
    Ok(image)
}
