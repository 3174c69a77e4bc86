//! Cross-fade between two routes rendering into the application outlet.
//!
//! Each slide fades out over a few frames. The outgoing slide defers its
//! teardown, the incoming one mounts right away, and both stay on screen
//! until the fade completes.
//!
//! Run with: RUST_LOG=outlet_router=debug cargo run --example cross_fade

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use outlet_router::{
    ComponentCatalog, ComponentHooks, ComponentInstance, ComponentOutlet, ComponentRoute,
    RenderRegistry, RenderTask, RouteBinding, RouteTree, RouterContext, Scheduler, TeardownHandle,
    UnmountDecision,
};
use serde_json::{json, Map};
use tracing_subscriber::EnvFilter;

const FADE_FRAMES: u32 = 3;

/// A running exit transition.
struct Fade {
    slide: String,
    frames_left: u32,
    done: TeardownHandle,
}

type Fades = Rc<RefCell<Vec<Fade>>>;

struct Slide {
    name: String,
    task: Weak<RenderTask>,
    fades: Fades,
}

impl ComponentInstance for Slide {
    fn render_task(&self) -> Option<Rc<RenderTask>> {
        self.task.upgrade()
    }

    fn hooks(&self) -> ComponentHooks {
        let name = self.name.clone();
        let fades = self.fades.clone();
        ComponentHooks::new()
            .on_mounted(|previous| {
                match previous {
                    Some(previous) => println!("  fade in, replacing {previous}"),
                    None => println!("  fade in"),
                }
                async { Ok(()) }
            })
            .on_will_unmount(move |next, done| {
                let next = next.map_or_else(|| "nothing".to_string(), |next| next.to_string());
                println!("  {name}: fading out towards {next}");
                fades.borrow_mut().push(Fade {
                    slide: name.clone(),
                    frames_left: FADE_FRAMES,
                    done,
                });
                async { Ok(UnmountDecision::Deferred) }
            })
    }
}

struct SlideRoute;

impl ComponentRoute for SlideRoute {}

/// Advance every fade by one frame, finishing those that ran out.
fn tick(fades: &Fades) {
    let finished: Vec<Fade> = {
        let mut fades = fades.borrow_mut();
        for fade in fades.iter_mut() {
            fade.frames_left = fade.frames_left.saturating_sub(1);
        }
        let (finished, running): (Vec<Fade>, Vec<Fade>) =
            fades.drain(..).partition(|fade| fade.frames_left == 0);
        *fades = running;
        finished
    };

    for fade in finished {
        println!("  {}: fade complete", fade.slide);
        fade.done.teardown();
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let scheduler = Scheduler::new();
    let registry = RenderRegistry::new();
    let tree = Rc::new(RouteTree::default());
    let context = RouterContext::new(registry.clone(), tree.clone(), scheduler.spawner());
    let fades: Fades = Rc::new(RefCell::new(Vec::new()));

    let catalog = ComponentCatalog::new();
    for name in ["intro", "features", "outro"] {
        let fades = fades.clone();
        catalog.register(name, move |task| {
            Rc::new(Slide {
                name: name.to_string(),
                task,
                fades: fades.clone(),
            })
        });
    }

    let outlet = ComponentOutlet::new(registry.clone(), catalog, scheduler.spawner(), "application");
    outlet.connect();

    let slides: Vec<Rc<RouteBinding<SlideRoute>>> = ["intro", "features", "outro"]
        .into_iter()
        .map(|name| RouteBinding::new(&context, name, SlideRoute))
        .collect();

    let mut current: Option<&Rc<RouteBinding<SlideRoute>>> = None;
    for (index, slide) in slides.iter().enumerate() {
        println!("\n-> transition to {}", slide.name());
        tree.begin_transition(slide.name());
        if let Some(previous) = current {
            previous.deactivate();
        }
        slide.setup(json!({ "index": index }), Map::new());
        tree.finish_transition(slide.name());
        current = Some(slide);

        for frame in 0..=FADE_FRAMES {
            scheduler.run_until_stalled();
            println!("  frame {frame}: mounted {:?}", outlet.mounted_components());
            tick(&fades);
        }
    }

    scheduler.run_until_stalled();
    println!("\nfinal: mounted {:?}", outlet.mounted_components());
    outlet.disconnect();
}
