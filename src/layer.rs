//! Guest layers as host custom layers.

use serde_json::{Map, Value};

use crate::config::{Antialiasing, RenderingMode};
use crate::context::DeckHandle;
use crate::error::{Error, Result};
use crate::guest::{GuestDeck, LayerDescriptor, LayerType};
use crate::host::HostMap;

/// A layer the host map draws through a callback in its own render loop.
pub trait CustomLayer<M: HostMap> {
    /// Unique layer id.
    fn id(&self) -> &str;

    /// The host added the layer to `map`.
    fn on_add(&mut self, map: &M);

    /// The host removed the layer from `map`.
    fn on_remove(&mut self, map: &M);

    /// Draw the layer for the current host frame.
    ///
    /// # Safety
    ///
    /// The map's GL context must be current.
    ///
    /// # Errors
    ///
    /// GPU resource failures; a layer that has nothing to draw returns
    /// `Ok(())`.
    unsafe fn render(&mut self, map: &M) -> Result<()>;
}

/// Construction options of a [`DeckLayer`].
pub struct LayerOptions<D: GuestDeck> {
    /// Unique, non-empty layer id. Fixed for the layer's lifetime.
    pub id: String,
    /// Context of the map the layer will be added to.
    pub deck: DeckHandle<D>,
    /// Guest layer constructor.
    pub layer_type: LayerType<D::Layer>,
    /// 2D overlay or 3D layer.
    pub rendering_mode: RenderingMode,
    /// Antialiasing for the whole context. Only honored before the first
    /// composite.
    pub antialiasing: Option<Antialiasing>,
    /// Guest layer props.
    pub props: Map<String, Value>,
}

impl<D: GuestDeck> LayerOptions<D> {
    /// Options with default rendering mode and no props.
    pub fn new(id: impl Into<String>, deck: DeckHandle<D>, layer_type: LayerType<D::Layer>) -> Self {
        Self {
            id: id.into(),
            deck,
            layer_type,
            rendering_mode: RenderingMode::default(),
            antialiasing: None,
            props: Map::new(),
        }
    }
}

/// A guest layer drawn inside the host map.
///
/// The layer registers itself with its context when the host adds it and
/// draws only itself when the host renders it. After [`destroy`](Self::destroy)
/// every callback is a no-op.
pub struct DeckLayer<D: GuestDeck> {
    descriptor: LayerDescriptor,
    layer_type: LayerType<D::Layer>,
    deck: Option<DeckHandle<D>>,
    attached: bool,
}

impl<D: GuestDeck> DeckLayer<D> {
    /// Build a layer.
    ///
    /// # Errors
    ///
    /// [`Error::MissingId`] if `options.id` is empty.
    pub fn new(options: LayerOptions<D>) -> Result<Self> {
        if options.id.is_empty() {
            return Err(Error::MissingId);
        }
        if let Some(antialiasing) = options.antialiasing {
            if !options.deck.borrow_mut().configure_antialiasing(antialiasing) {
                tracing::warn!(
                    id = %options.id,
                    "antialiasing can only be chosen before the first frame, ignoring"
                );
            }
        }

        let mut props = options.props;
        props.remove("id");
        Ok(Self {
            descriptor: LayerDescriptor {
                id: options.id,
                rendering_mode: options.rendering_mode,
                props,
            },
            layer_type: options.layer_type,
            deck: Some(options.deck),
            attached: false,
        })
    }

    /// The layer's guest descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &LayerDescriptor {
        &self.descriptor
    }

    /// 2D overlay or 3D layer.
    #[must_use]
    pub fn rendering_mode(&self) -> RenderingMode {
        self.descriptor.rendering_mode
    }

    /// Whether the host currently has the layer.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether [`destroy`](Self::destroy) was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.deck.is_none()
    }

    /// Merge `props` into the layer's props. `id` is ignored;
    /// `renderingMode` is applied when valid. An attached layer is rebuilt
    /// in the guest.
    pub fn set_props(&mut self, props: Map<String, Value>) {
        let Some(deck) = &self.deck else {
            return;
        };
        for (key, value) in props {
            match key.as_str() {
                "id" => {}
                "renderingMode" => match serde_json::from_value(value) {
                    Ok(mode) => self.descriptor.rendering_mode = mode,
                    Err(err) => tracing::warn!(%err, "ignoring invalid rendering mode"),
                },
                _ => {
                    self.descriptor.props.insert(key, value);
                }
            }
        }
        if self.attached {
            deck.borrow_mut()
                .update_layer(self.descriptor.clone(), self.layer_type.clone());
        }
    }

    /// Unregister the layer and release the context handle. GPU objects are
    /// released when the last handle of the context is dropped.
    pub fn destroy(&mut self) {
        if let Some(deck) = self.deck.take() {
            deck.borrow_mut().remove_layer(&self.descriptor.id);
        }
        self.attached = false;
    }

    fn skips_map_events(deck: &DeckHandle<D>) -> bool {
        deck.borrow().options().skip_map_add_remove_events
    }
}

impl<D, M> CustomLayer<M> for DeckLayer<D>
where
    D: GuestDeck,
    M: HostMap<Gl = D::Gl>,
{
    fn id(&self) -> &str {
        &self.descriptor.id
    }

    fn on_add(&mut self, _map: &M) {
        let Some(deck) = &self.deck else {
            return;
        };
        self.attached = true;
        if Self::skips_map_events(deck) {
            return;
        }
        deck.borrow_mut()
            .add_layer(self.descriptor.clone(), self.layer_type.clone());
    }

    fn on_remove(&mut self, _map: &M) {
        let Some(deck) = &self.deck else {
            return;
        };
        if Self::skips_map_events(deck) {
            return;
        }
        deck.borrow_mut().remove_layer(&self.descriptor.id);
        self.attached = false;
    }

    unsafe fn render(&mut self, map: &M) -> Result<()> {
        let Some(deck) = &self.deck else {
            return Ok(());
        };
        if !self.attached {
            return Ok(());
        }
        unsafe { deck.borrow_mut().render_layer(map, &self.descriptor.id) }?;
        Ok(())
    }
}
