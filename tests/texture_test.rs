use instanced_fly::{
    data_structures::texture::decode_image,
    resources::{load_image, load_mesh_obj},
};

#[tokio::test]
async fn dart_texture_decodes_from_assets() {
    let img = load_image("textures/dart.png").await.unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (16, 16));
    assert_eq!(img.get_pixel(0, 0).0, [40, 60, 160, 255]);
    assert_eq!(img.get_pixel(4, 0).0, [60, 90, 200, 255]);
    assert_eq!(img.get_pixel(0, 8).0, [240, 240, 250, 255]);
}

#[tokio::test]
async fn dart_mesh_loads_from_assets() {
    let mesh = load_mesh_obj("models/dart.obj").await.unwrap();
    assert!(!mesh.vertices().is_empty());
    assert_eq!(mesh.num_elements() % 3, 0);
}

#[tokio::test]
async fn missing_texture_names_the_file() {
    let err = load_image("textures/nope.png").await.unwrap_err();
    assert!(format!("{:#}", err).contains("textures/nope.png"));
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    let err = decode_image(b"not an image", "broken").unwrap_err();
    assert!(err.to_string().contains("broken"));
}
