use crate::data_structures::{model::Mesh, texture};

/**
 * This module contains all logic for loading meshes and textures from external files.
 *
 * Files are resolved relative to `./assets` natively and to `<origin>/assets` on the web.
 */
pub mod mesh;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    use anyhow::Context;

    let window = web_sys::window().context("no browser window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page has no origin"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read_to_string(path).await?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(path).await?
    };

    Ok(data)
}

/// Load and parse an OBJ file into a single triangle mesh.
pub async fn load_mesh_obj(file_name: &str) -> anyhow::Result<Mesh> {
    use anyhow::Context;

    log::info!("loading mesh {}", file_name);
    let text = load_string(file_name)
        .await
        .with_context(|| format!("could not read mesh '{}'", file_name))?;
    mesh::parse_obj(file_name, &text)
}

/// Read and decode an image. Uploading it needs a device, see
/// [`Context::texture`](crate::context::Context::texture).
pub async fn load_image(file_name: &str) -> anyhow::Result<image::DynamicImage> {
    use anyhow::Context;

    log::info!("loading texture {}", file_name);
    let data = load_binary(file_name)
        .await
        .with_context(|| format!("could not read texture '{}'", file_name))?;
    texture::decode_image(&data, file_name)
}
