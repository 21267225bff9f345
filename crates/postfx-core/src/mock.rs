//! Recording backend used by unit tests.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::backend::{Backend, Binding, PassFactory};
use crate::effect::{Effect, EffectContext};
use crate::error::{ComposerError, Result};
use crate::options::ComposerOptions;
use crate::pass::{Pass, PassKind};
use crate::size::{FrameBufferType, Size};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockTarget {
    pub serial: usize,
    pub label: String,
    pub size: Size,
    pub frame_buffer_type: FrameBufferType,
}

#[derive(Debug, Default)]
pub(crate) struct MockFrame {
    pub events: Vec<String>,
}

pub(crate) struct MockScene;
pub(crate) struct MockCamera;

#[derive(Debug, Clone)]
pub(crate) struct MockResource {
    pub label: &'static str,
}

/// Counts how many passes and effects are currently alive (built but not disposed).
#[derive(Debug, Default)]
pub(crate) struct Census {
    pub passes_built: Cell<usize>,
    pub passes_disposed: Cell<usize>,
    pub effects_disposed: Cell<usize>,
    pub resources_loaded: Cell<usize>,
}

pub(crate) struct MockBackend {
    pub id: u64,
    pub fail_resource: bool,
    pub census: Rc<Census>,
    targets: Cell<usize>,
    pub allocations: RefCell<Vec<MockTarget>>,
}

impl MockBackend {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            fail_resource: false,
            census: Rc::new(Census::default()),
            targets: Cell::new(0),
            allocations: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_resource(mut self) -> Self {
        self.fail_resource = true;
        self
    }
}

fn describe(target: Option<&MockTarget>) -> String {
    target.map_or_else(|| "screen".to_string(), |t| format!("t{}", t.serial))
}

impl Backend for MockBackend {
    type Target = MockTarget;
    type Frame = MockFrame;
    type Scene = MockScene;
    type Camera = MockCamera;

    fn renderer_id(&self) -> u64 {
        self.id
    }

    fn create_target(
        &self,
        label: &str,
        size: Size,
        frame_buffer_type: FrameBufferType,
    ) -> Result<MockTarget> {
        let serial = self.targets.get();
        self.targets.set(serial + 1);
        let target = MockTarget {
            serial,
            label: label.to_string(),
            size,
            frame_buffer_type,
        };
        self.allocations.borrow_mut().push(target.clone());
        Ok(target)
    }

    fn copy_target(
        &self,
        frame: &mut MockFrame,
        source: &MockTarget,
        destination: Option<&MockTarget>,
    ) -> Result<()> {
        frame.events.push(format!(
            "copy t{}->{}",
            source.serial,
            describe(destination)
        ));
        Ok(())
    }
}

pub(crate) struct MockPass {
    pub name: String,
    pub kind: PassKind,
    pub swap: bool,
    pub enabled: bool,
    pub to_screen: bool,
    pub size: Option<Size>,
    census: Rc<Census>,
}

impl MockPass {
    pub fn new(name: &str, kind: PassKind, swap: bool, census: Rc<Census>) -> Self {
        census.passes_built.set(census.passes_built.get() + 1);
        Self {
            name: name.to_string(),
            kind,
            swap,
            enabled: true,
            to_screen: false,
            size: None,
            census,
        }
    }
}

impl Pass<MockBackend> for MockPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PassKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn needs_swap(&self) -> bool {
        self.swap
    }

    fn render_to_screen(&self) -> bool {
        self.to_screen
    }

    fn set_render_to_screen(&mut self, render_to_screen: bool) {
        self.to_screen = render_to_screen;
    }

    fn set_size(&mut self, _backend: &MockBackend, size: Size) -> Result<()> {
        self.size = Some(size);
        Ok(())
    }

    fn render(
        &mut self,
        _backend: &MockBackend,
        frame: &mut MockFrame,
        input: &MockTarget,
        output: &MockTarget,
        delta: f32,
    ) -> Result<()> {
        let destination = if self.to_screen { None } else { Some(output) };
        frame.events.push(format!(
            "{} t{}->{} dt={delta}",
            self.name,
            input.serial,
            describe(destination)
        ));
        Ok(())
    }

    fn dispose(&mut self) {
        self.census
            .passes_disposed
            .set(self.census.passes_disposed.get() + 1);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) struct MockEffect {
    pub name: String,
    pub threshold: Option<f32>,
    pub size: Option<Size>,
    pub fail_size: bool,
    census: Option<Rc<Census>>,
}

impl MockEffect {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            threshold: None,
            size: None,
            fail_size: false,
            census: None,
        }
    }

    pub fn boxed(name: &str) -> Box<dyn Effect<MockBackend>> {
        Box::new(Self::new(name))
    }

    pub fn tracked(name: &str, census: Rc<Census>) -> Box<dyn Effect<MockBackend>> {
        Box::new(Self {
            census: Some(census),
            ..Self::new(name)
        })
    }

    /// An effect whose `set_size` always fails.
    pub fn unsizable(name: &str, census: Rc<Census>) -> Box<dyn Effect<MockBackend>> {
        Box::new(Self {
            fail_size: true,
            census: Some(census),
            ..Self::new(name)
        })
    }
}

impl Effect<MockBackend> for MockEffect {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_size(&mut self, _backend: &MockBackend, size: Size) -> Result<()> {
        if self.fail_size {
            return Err(ComposerError::PassConstruction(format!(
                "{} cannot be sized",
                self.name
            )));
        }
        self.size = Some(size);
        Ok(())
    }

    fn apply(
        &mut self,
        ctx: &mut EffectContext<'_, MockBackend>,
        input: &MockTarget,
        output: Option<&MockTarget>,
    ) -> Result<()> {
        ctx.frame.events.push(format!(
            "{} t{}->{}",
            self.name,
            input.serial,
            describe(output)
        ));
        Ok(())
    }

    fn dispose(&mut self) {
        if let Some(census) = &self.census {
            census
                .effects_disposed
                .set(census.effects_disposed.get() + 1);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl PassFactory for MockBackend {
    type AntialiasResource = MockResource;
    type NormalBuffer = Rc<Cell<u32>>;

    fn create_render_pass(
        &self,
        _binding: &Binding<Self>,
        _options: &ComposerOptions,
    ) -> Result<Box<dyn Pass<Self>>> {
        Ok(Box::new(MockPass::new(
            "render",
            PassKind::Render,
            false,
            Rc::clone(&self.census),
        )))
    }

    fn create_normal_buffer(&self) -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    fn create_normal_pass(
        &self,
        _binding: &Binding<Self>,
        buffer: &Rc<Cell<u32>>,
    ) -> Result<Box<dyn Pass<Self>>> {
        buffer.set(buffer.get() + 1);
        Ok(Box::new(MockPass::new(
            "normal",
            PassKind::Normal,
            false,
            Rc::clone(&self.census),
        )))
    }

    fn load_antialias_resource(&self) -> Result<MockResource> {
        if self.fail_resource {
            return Err(ComposerError::ResourceLoad("missing lookup image".into()));
        }
        self.census
            .resources_loaded
            .set(self.census.resources_loaded.get() + 1);
        Ok(MockResource { label: "smaa" })
    }

    fn create_antialias_effect(
        &self,
        resource: &MockResource,
        edge_detection: f32,
    ) -> Result<Box<dyn Effect<Self>>> {
        Ok(Box::new(MockEffect {
            threshold: Some(edge_detection),
            ..MockEffect::new(resource.label)
        }))
    }
}
