use std::io::Cursor;

use anyhow::Context;
use bytes::Bytes;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use tracing::{debug, instrument};

use crate::state::AppState;

pub const PROFILE_PIC_SIZE: u32 = 128;
const PROFILE_PIC_PREFIX: &str = "profile_pics";

/// Center-crops to a square on the shorter side, then resizes to `size`×`size` PNG.
pub fn square_thumbnail(input: &[u8], size: u32) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(input).context("decode image")?;
    let side = img.width().min(img.height());
    let x = (img.width() - side) / 2;
    let y = (img.height() - side) / 2;
    let square: DynamicImage = img
        .crop_imm(x, y, side, side)
        .resize_exact(size, size, FilterType::Lanczos3);

    let mut out = Vec::new();
    square
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .context("encode png")?;
    Ok(out)
}

/// One key per username: the hex of its UTF-8 bytes, so distinct names never
/// share an object and no name can escape the prefix.
fn profile_pic_key(username: &str) -> String {
    let stem: String = username.bytes().map(|b| format!("{b:02x}")).collect();
    format!("{}/{}.png", PROFILE_PIC_PREFIX, stem)
}

/// Crops, uploads and records a new profile picture. Returns its URL.
#[instrument(skip(st, input), fields(bytes = input.len()))]
pub async fn set_profile_picture(
    st: &AppState,
    username: &str,
    input: Bytes,
) -> anyhow::Result<String> {
    let png = tokio::task::spawn_blocking(move || square_thumbnail(&input, PROFILE_PIC_SIZE))
        .await
        .context("thumbnail task")??;

    let key = profile_pic_key(username);
    let url = st
        .storage
        .put_object(&key, Bytes::from(png), "image/png")
        .await
        .with_context(|| format!("put_object {}", key))?;
    st.users.set_profile_picture(username, &url)?;
    debug!(%username, %url, "profile picture stored");
    Ok(url)
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn encode(img: RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), format)
            .unwrap();
        buf
    }

    #[test]
    fn wide_image_is_center_cropped() {
        // red | green | blue thirds; the crop keeps the green middle
        let img = RgbImage::from_fn(300, 100, |x, _| match x {
            0..=99 => Rgb([255, 0, 0]),
            100..=199 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });
        let out = square_thumbnail(&encode(img, ImageFormat::Png), PROFILE_PIC_SIZE).unwrap();

        let thumb = image::load_from_memory(&out).unwrap();
        assert_eq!(thumb.dimensions(), (128, 128));
        let center = thumb.to_rgb8().get_pixel(64, 64).0;
        assert!(center[1] > 200 && center[0] < 50 && center[2] < 50, "{center:?}");
    }

    #[test]
    fn tall_and_tiny_images_end_up_square() {
        let tall = RgbImage::from_pixel(40, 90, Rgb([10, 20, 30]));
        let out = square_thumbnail(&encode(tall, ImageFormat::Jpeg), 128).unwrap();
        assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (128, 128));
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(square_thumbnail(b"definitely not an image", 128).is_err());
    }

    #[test]
    fn profile_keys_are_flat_and_distinct() {
        assert_eq!(profile_pic_key("bob"), "profile_pics/626f62.png");
        assert_eq!(profile_pic_key("../evil"), "profile_pics/2e2e2f6576696c.png");
        assert_eq!(profile_pic_key("日本"), "profile_pics/e697a5e69cac.png");

        let names = ["bob", "bob.", "Bob", "b/ob", "日本", "中文", ""];
        let keys: std::collections::HashSet<_> = names.iter().map(|n| profile_pic_key(n)).collect();
        assert_eq!(keys.len(), names.len());
        assert!(keys.iter().all(|k| k.matches('/').count() == 1));
    }

    #[tokio::test]
    async fn set_profile_picture_updates_user() {
        let (_dir, state, storage) = AppState::fake().await;
        state.users.create("bob", "pw").unwrap();
        let png = encode(RgbImage::from_pixel(64, 32, Rgb([1, 2, 3])), ImageFormat::Png);

        let url = set_profile_picture(&state, "bob", Bytes::from(png)).await.unwrap();
        assert_eq!(url, "https://fake.local/profile_pics/626f62.png");
        assert!(storage.has("profile_pics/626f62.png"));
        assert_eq!(state.users.get("bob").unwrap().profile_pic.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn similar_usernames_keep_separate_pictures() {
        let (_dir, state, storage) = AppState::fake().await;
        state.users.create("bob", "pw").unwrap();
        state.users.create("bob.", "pw").unwrap();
        let red = encode(RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])), ImageFormat::Png);
        let blue = encode(RgbImage::from_pixel(8, 8, Rgb([0, 0, 255])), ImageFormat::Png);

        let bob = set_profile_picture(&state, "bob", Bytes::from(red)).await.unwrap();
        let bob_dot = set_profile_picture(&state, "bob.", Bytes::from(blue)).await.unwrap();
        assert_ne!(bob, bob_dot);
        assert_eq!(storage.objects.lock().unwrap().len(), 2);

        let key = bob.trim_start_matches("https://fake.local/");
        let stored = storage.objects.lock().unwrap()[key].clone();
        let pixel = image::load_from_memory(&stored).unwrap().to_rgb8().get_pixel(0, 0).0;
        assert!(pixel[0] > 200 && pixel[2] < 50, "{pixel:?}");
    }
}
