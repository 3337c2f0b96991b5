//! Favicons and the social preview image, generated from the site logo and the hero photo.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use image::{
    DynamicImage, ExtendedColorType, ImageFormat, ImageResult, RgbaImage,
    codecs::ico::{IcoEncoder, IcoFrame},
    imageops::{self, FilterType},
};
use tracing::info;

use crate::error::{Error, Result};

/// PNG favicons: edge length and file name.
pub const FAVICONS: &[(u32, &str)] = &[
    (16, "favicon-16x16.png"),
    (32, "favicon-32x32.png"),
    (48, "favicon-48x48.png"),
    (180, "apple-touch-icon.png"),
    (192, "android-chrome-192x192.png"),
    (512, "android-chrome-512x512.png"),
];

/// Frames packed into the `.ico` file.
pub const ICO_SIZES: &[u32] = &[16, 32, 48];
pub const ICO_FILE: &str = "favicon.ico";

pub const OG_WIDTH: u32 = 1200;
pub const OG_HEIGHT: u32 = 630;

/// Rows outside `OG_BAND` get `OG_SHADE_EDGE`, the rest `OG_SHADE_CENTER` (alpha of black).
const OG_BAND: (u32, u32) = (80, 500);
const OG_SHADE_EDGE: u8 = 100;
const OG_SHADE_CENTER: u8 = 150;

pub fn open(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| Error::image(path, e))
}

fn square(img: &DynamicImage, size: u32) -> DynamicImage {
    img.resize_exact(size, size, FilterType::Lanczos3)
}

/// Scale `logo` to every favicon size and write the PNGs plus the multi-size `.ico`.
///
/// Returns the written files in order.
pub fn write_favicons(logo: &DynamicImage, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;
    let logo = DynamicImage::ImageRgba8(logo.to_rgba8());

    let mut written = Vec::with_capacity(FAVICONS.len() + 1);
    for &(size, name) in FAVICONS {
        let path = output_dir.join(name);
        square(&logo, size)
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| Error::image(&path, e))?;
        info!("created {name} ({size}x{size})");
        written.push(path);
    }

    let path = output_dir.join(ICO_FILE);
    write_ico(&logo, &path)?;
    info!("created {ICO_FILE} ({} sizes)", ICO_SIZES.len());
    written.push(path);
    Ok(written)
}

fn write_ico(logo: &DynamicImage, path: &Path) -> Result<()> {
    let frames = ICO_SIZES
        .iter()
        .map(|&size| {
            let frame = square(logo, size).to_rgba8();
            IcoFrame::as_png(frame.as_raw(), size, size, ExtendedColorType::Rgba8)
        })
        .collect::<ImageResult<Vec<_>>>()
        .map_err(|e| Error::image(path, e))?;
    let file = fs::File::create(path).map_err(|e| Error::io(path, e))?;
    IcoEncoder::new(io::BufWriter::new(file))
        .encode_images(&frames)
        .map_err(|e| Error::image(path, e))
}

/// Largest centred region of `img` with the aspect ratio `width:height`.
fn crop_to_ratio(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (w, h) = (u64::from(img.width()), u64::from(img.height()));
    let (tw, th) = (u64::from(width), u64::from(height));
    if w * th > h * tw {
        let new_w = ((h * tw / th) as u32).max(1);
        img.crop_imm((img.width() - new_w) / 2, 0, new_w, img.height())
    } else {
        let new_h = ((w * th / tw) as u32).max(1);
        img.crop_imm(0, (img.height() - new_h) / 2, img.width(), new_h)
    }
}

fn shade(y: u32) -> u8 {
    if y < OG_BAND.0 || y > OG_BAND.1 {
        OG_SHADE_EDGE
    } else {
        OG_SHADE_CENTER
    }
}

/// The social preview: `hero` cropped and scaled to 1200x630, darkened in horizontal bands,
/// with `caption` centred on top.
pub fn social_image(hero: &DynamicImage, caption: Option<&DynamicImage>) -> RgbaImage {
    let mut canvas = crop_to_ratio(hero, OG_WIDTH, OG_HEIGHT)
        .resize_exact(OG_WIDTH, OG_HEIGHT, FilterType::Lanczos3)
        .to_rgba8();

    for (_, y, px) in canvas.enumerate_pixels_mut() {
        let keep = 255 - u16::from(shade(y));
        for c in &mut px.0[..3] {
            *c = ((u16::from(*c) * keep + 127) / 255) as u8;
        }
        px.0[3] = u8::MAX;
    }

    if let Some(caption) = caption {
        let caption = caption.to_rgba8();
        let x = (i64::from(OG_WIDTH) - i64::from(caption.width())) / 2;
        let y = (i64::from(OG_HEIGHT) - i64::from(caption.height())) / 2;
        imageops::overlay(&mut canvas, &caption, x, y);
    }
    canvas
}

/// Compose the social preview from files and write it as an opaque PNG.
pub fn write_social_image(hero: &Path, caption: Option<&Path>, output: &Path) -> Result<()> {
    let hero = open(hero)?;
    let caption = caption.map(open).transpose()?;
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let image = DynamicImage::ImageRgba8(social_image(&hero, caption.as_ref())).to_rgb8();
    image
        .save_with_format(output, ImageFormat::Png)
        .map_err(|e| Error::image(output, e))?;
    info!("created {} ({OG_WIDTH}x{OG_HEIGHT})", output.display());
    Ok(())
}
