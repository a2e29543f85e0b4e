use instanced_fly::{
    Matrix4, Vector3, WindowEvent,
    config::EngineConfig,
    context::Context,
    data_structures::{
        instance::{BestEffort, InstanceSet},
        model::Mesh,
        primitives,
        texture::DiffuseTexture,
    },
    editor::TransformEditor,
    flow::{GraphicsFlow, flow_constructor},
    image::DynamicImage,
    render::{Instanced, Render},
    resources::{load_image, load_mesh_obj},
    wgpu,
};
use instant::Duration;

const BRICK: [u8; 4] = [178, 84, 60, 255];
const MORTAR: [u8; 4] = [205, 200, 190, 255];

struct Drawable {
    set: InstanceSet<wgpu::Buffer>,
    texture: DiffuseTexture,
}

impl Drawable {
    fn instanced(&self) -> Instanced<'_> {
        Instanced::new(&self.set, &self.texture)
    }
}

/// 1000 cubes on the floor, a row of 100 darts driven by the editor and one
/// of each remaining primitive.
struct Scene {
    dart_mesh: Option<Mesh>,
    dart_image: Option<DynamicImage>,
    cubes: Option<Drawable>,
    darts: Option<Drawable>,
    shapes: Vec<Drawable>,
    editor: TransformEditor,
}

impl Scene {
    async fn new() -> anyhow::Result<Self> {
        Ok(Self {
            dart_mesh: Some(load_mesh_obj("models/dart.obj").await?),
            dart_image: Some(load_image("textures/dart.png").await?),
            cubes: None,
            darts: None,
            shapes: Vec::new(),
            editor: TransformEditor::new(),
        })
    }
}

impl GraphicsFlow for Scene {
    fn on_init(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
        let mut cubes = InstanceSet::new(&*ctx, "cubes", primitives::cube(), 1000);
        for i in 0..cubes.instance_count() {
            let (z, x) = (i / 10, i % 10);
            cubes
                .set_position(i, Vector3::new(z as f32, -0.5, x as f32))
                .best_effort();
        }
        self.cubes = Some(Drawable {
            set: cubes,
            texture: ctx.checkerboard(4, BRICK, MORTAR),
        });

        let (Some(mesh), Some(image)) = (self.dart_mesh.take(), self.dart_image.take()) else {
            anyhow::bail!("scene initialised twice");
        };
        let mut darts = InstanceSet::new(&*ctx, "darts", mesh, 100);
        for i in 0..darts.instance_count() {
            darts
                .set_position(i, Vector3::new(1.0 + i as f32, 0.0, 0.0))
                .best_effort();
        }
        darts.rotate(1, Vector3::new(0.0, 180.0, 0.0))?;
        darts.scale_by(1, Vector3::new(2.0, 2.0, 2.0))?;
        self.darts = Some(Drawable {
            set: darts,
            texture: ctx.texture("dart", &image),
        });

        let shapes = [
            (primitives::triangle(), Vector3::new(-2.0, 1.0, 0.0)),
            (primitives::square(), Vector3::new(-2.0, 1.0, 2.0)),
            (primitives::pyramid(), Vector3::new(-2.0, 1.0, 4.0)),
        ];
        for (mesh, position) in shapes {
            let label = mesh.name().to_string();
            let mut set = InstanceSet::new(&*ctx, &label, mesh, 0);
            set.add_instance(Matrix4::from_translation(position));
            self.shapes.push(Drawable {
                set,
                texture: ctx.white_texture(),
            });
        }
        Ok(())
    }

    fn on_window_events(&mut self, _ctx: &Context, event: &WindowEvent) {
        if let Some(darts) = &mut self.darts {
            self.editor.handle_window_events(&mut darts.set, event);
        }
    }

    fn on_update(&mut self, _ctx: &Context, dt: Duration) {
        for shape in &mut self.shapes {
            shape
                .set
                .rotate(0, Vector3::new(0.0, 45.0 * dt.as_secs_f32(), 0.0))
                .best_effort();
        }
    }

    fn write_to_buffer(&mut self, ctx: &Context) {
        let drawables = self
            .cubes
            .iter_mut()
            .chain(self.darts.iter_mut())
            .chain(self.shapes.iter_mut());
        for drawable in drawables {
            drawable.set.synchronize(ctx, false);
        }
    }

    fn on_render(&self) -> Render<'_> {
        let mut batch: Vec<Instanced> = Vec::new();
        batch.extend(self.darts.iter().map(Drawable::instanced));
        batch.extend(self.cubes.iter().map(Drawable::instanced));
        Render::Composed(vec![
            Render::Defaults(batch),
            Render::Defaults(self.shapes.iter().map(Drawable::instanced).collect()),
        ])
    }
}

fn main() {
    let scene = flow_constructor(|| async {
        let scene = Scene::new().await?;
        anyhow::Ok(Box::new(scene) as Box<dyn GraphicsFlow>)
    });

    let config = EngineConfig::default().with_title("instanced-fly");
    if let Err(e) = instanced_fly::flow::run(config, vec![scene]) {
        log::error!("{:#}", e);
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
