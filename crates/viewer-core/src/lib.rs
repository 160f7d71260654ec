use doc_model::{DocumentRecord, FileType};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Viewport multiples given to formats that scroll their own pages.
pub const OVERSIZED_VIEWPORT_HEIGHTS: u16 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSource {
    pub uri: String,
    pub file_type: FileType,
}

impl From<&DocumentRecord> for ViewerSource {
    fn from(record: &DocumentRecord) -> Self {
        Self { uri: record.uri.clone(), file_type: record.file_type }
    }
}

/// Read-only renderer for the underlying file.
pub trait ViewerSurface {
    fn show(&self, source: &ViewerSource);

    /// Height of the rendered content, `None` while nothing is mounted.
    fn rendered_height_px(&self) -> Option<f32>;
}

/// Surface for shells without a renderer: remembers what it was asked to show
/// and reports a fixed content height.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    height_px: Option<f32>,
    shown: RefCell<Option<ViewerSource>>,
}

impl HeadlessSurface {
    pub fn new(height_px: Option<f32>) -> Self {
        Self { height_px, shown: RefCell::new(None) }
    }

    pub fn shown(&self) -> Option<ViewerSource> {
        self.shown.borrow().clone()
    }
}

impl ViewerSurface for HeadlessSurface {
    fn show(&self, source: &ViewerSource) {
        *self.shown.borrow_mut() = Some(source.clone());
    }

    fn rendered_height_px(&self) -> Option<f32> {
        self.shown.borrow().as_ref().and(self.height_px)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OverlayHeight {
    #[default]
    Fill,
    Pixels(f32),
    ViewportHeights(u16),
}

impl fmt::Display for OverlayHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fill => f.write_str("100%"),
            Self::Pixels(px) => write!(f, "{px}px"),
            Self::ViewportHeights(vh) => write!(f, "{vh}vh"),
        }
    }
}

pub fn overlay_height_for(
    file_type: FileType,
    rendered_height_px: Option<f32>,
    current: OverlayHeight,
) -> OverlayHeight {
    match (file_type, rendered_height_px) {
        (FileType::Pdf, Some(height)) => OverlayHeight::Pixels(height),
        (FileType::Xlsx | FileType::Docx | FileType::Ppt, _) => {
            OverlayHeight::ViewportHeights(OVERSIZED_VIEWPORT_HEIGHTS)
        }
        _ => current,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width_px: f32,
    pub height_px: f32,
}

type Listener = Box<dyn FnMut(Viewport)>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Resize notifications for the current window. Single-threaded; listeners
/// must not subscribe or unsubscribe from inside a callback.
#[derive(Clone, Default)]
pub struct ResizeEvents {
    listeners: Rc<RefCell<Listeners>>,
}

impl fmt::Debug for ResizeEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeEvents").field("listeners", &self.listener_count()).finish()
    }
}

impl ResizeEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl FnMut(Viewport) + 'static) -> ResizeSubscription {
        let mut listeners = self.listeners.borrow_mut();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Box::new(listener)));

        ResizeSubscription { id, listeners: Rc::downgrade(&self.listeners) }
    }

    pub fn emit(&self, viewport: Viewport) {
        let mut listeners = self.listeners.borrow_mut();
        for (_, listener) in listeners.entries.iter_mut() {
            listener(viewport);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }
}

/// Registration handle. Dropping it removes the listener.
#[must_use = "dropping the subscription unregisters the listener"]
pub struct ResizeSubscription {
    id: u64,
    listeners: Weak<RefCell<Listeners>>,
}

impl fmt::Debug for ResizeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeSubscription").field("id", &self.id).finish()
    }
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Keeps the overlay height in step with the viewer for one document.
#[derive(Debug)]
pub struct OverlaySizer {
    height: Rc<Cell<OverlayHeight>>,
    _subscription: ResizeSubscription,
}

impl OverlaySizer {
    pub fn attach(
        events: &ResizeEvents,
        surface: Rc<dyn ViewerSurface>,
        file_type: FileType,
    ) -> Self {
        let height = Rc::new(Cell::new(OverlayHeight::default()));
        height.set(overlay_height_for(file_type, surface.rendered_height_px(), height.get()));

        let tracked = Rc::clone(&height);
        let subscription = events.subscribe(move |viewport| {
            let next = overlay_height_for(file_type, surface.rendered_height_px(), tracked.get());
            tracing::trace!(?viewport, %next, "overlay resized");
            tracked.set(next);
        });

        Self { height, _subscription: subscription }
    }

    pub fn height(&self) -> OverlayHeight {
        self.height.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeSurface {
        height: Cell<Option<f32>>,
        shown: RefCell<Vec<ViewerSource>>,
    }

    impl ViewerSurface for FakeSurface {
        fn show(&self, source: &ViewerSource) {
            self.shown.borrow_mut().push(source.clone());
        }

        fn rendered_height_px(&self) -> Option<f32> {
            self.height.get()
        }
    }

    const VIEWPORT: Viewport = Viewport { width_px: 1280.0, height_px: 800.0 };

    #[test]
    fn pdf_tracks_rendered_height() {
        assert_eq!(
            overlay_height_for(FileType::Pdf, Some(2400.0), OverlayHeight::Fill),
            OverlayHeight::Pixels(2400.0)
        );
        assert_eq!(overlay_height_for(FileType::Pdf, None, OverlayHeight::Fill), OverlayHeight::Fill);
    }

    #[test]
    fn paginated_formats_use_oversized_height() {
        for file_type in [FileType::Xlsx, FileType::Docx, FileType::Ppt] {
            assert_eq!(
                overlay_height_for(file_type, Some(10.0), OverlayHeight::Fill),
                OverlayHeight::ViewportHeights(500)
            );
        }
    }

    #[test]
    fn images_keep_current_height() {
        let current = OverlayHeight::Pixels(12.0);
        assert_eq!(overlay_height_for(FileType::Image, Some(900.0), current), current);
    }

    #[test]
    fn height_renders_as_css_length() {
        assert_eq!(OverlayHeight::Fill.to_string(), "100%");
        assert_eq!(OverlayHeight::Pixels(1200.0).to_string(), "1200px");
        assert_eq!(OverlayHeight::ViewportHeights(500).to_string(), "500vh");
    }

    #[test]
    fn dropping_subscription_unregisters_listener() {
        let events = ResizeEvents::new();
        let calls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&calls);
        let subscription = events.subscribe(move |_| counter.set(counter.get() + 1));
        events.emit(VIEWPORT);
        assert_eq!(events.listener_count(), 1);

        drop(subscription);
        events.emit(VIEWPORT);

        assert_eq!(events.listener_count(), 0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn sizer_recomputes_on_every_resize() {
        let events = ResizeEvents::new();
        let surface = Rc::new(FakeSurface::default());
        surface.height.set(Some(1000.0));

        let sizer = OverlaySizer::attach(&events, surface.clone(), FileType::Pdf);
        assert_eq!(sizer.height(), OverlayHeight::Pixels(1000.0));

        surface.height.set(Some(1450.5));
        events.emit(VIEWPORT);
        assert_eq!(sizer.height(), OverlayHeight::Pixels(1450.5));

        surface.height.set(Some(700.0));
        events.emit(Viewport { width_px: 640.0, height_px: 480.0 });
        assert_eq!(sizer.height(), OverlayHeight::Pixels(700.0));
    }

    #[test]
    fn dropping_sizer_leaves_no_listener() {
        let events = ResizeEvents::new();
        let surface: Rc<dyn ViewerSurface> = Rc::new(FakeSurface::default());

        let sizer = OverlaySizer::attach(&events, surface, FileType::Docx);
        assert_eq!(sizer.height(), OverlayHeight::ViewportHeights(500));
        assert_eq!(events.listener_count(), 1);

        drop(sizer);
        assert_eq!(events.listener_count(), 0);
    }

    #[test]
    fn headless_surface_reports_height_once_mounted() {
        let surface = HeadlessSurface::new(Some(900.0));
        assert_eq!(surface.rendered_height_px(), None);

        let record = DocumentRecord::new("1", "a.pdf", "/a.pdf", FileType::Pdf);
        surface.show(&ViewerSource::from(&record));

        assert_eq!(surface.rendered_height_px(), Some(900.0));
        assert_eq!(surface.shown().map(|source| source.uri), Some("/a.pdf".to_owned()));
    }

    #[test]
    fn source_comes_from_record() {
        let record = DocumentRecord::new("1", "deck.ppt", "/files/deck.ppt", FileType::Ppt);
        let surface = FakeSurface::default();

        surface.show(&ViewerSource::from(&record));

        let shown = surface.shown.borrow();
        assert_eq!(shown[0].uri, "/files/deck.ppt");
        assert_eq!(shown[0].file_type, FileType::Ppt);
    }
}
