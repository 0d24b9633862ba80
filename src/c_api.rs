use crate::{
    body::{Body, BodyId},
    simulation::{CrowdError, Simulation},
};
use ultraviolet::Vec2;

/// `Crowd_Gather`/`Crowd_Add`: null handle, null text or invalid UTF-8.
pub const CROWD_INVALID_ARGUMENT: i32 = -1;
/// `Crowd_Gather`/`Crowd_Add`: the text holds no accepted glyphs.
pub const CROWD_NO_GLYPHS: i32 = -2;
/// `Crowd_Add`: the crowd is already full.
pub const CROWD_CAPACITY_REACHED: i32 = -3;

/// Flat per-body snapshot for foreign renderers.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyView {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// 0 normal, 1 gathering, 2 exploding.
    pub mode: u8,
    /// Unicode scalar value of the glyph.
    pub glyph: u32,
}

impl From<&Body> for BodyView {
    fn from(body: &Body) -> Self {
        Self {
            id: body.id.0,
            x: body.pos.x,
            y: body.pos.y,
            radius: body.radius,
            mode: body.mode.code(),
            glyph: u32::from(body.glyph),
        }
    }
}

/// Simulation plus the view buffer handed out by `Crowd_GetBodies`.
#[derive(Debug, Default)]
pub struct CrowdHandle {
    sim: Simulation,
    views: Vec<BodyView>,
}

impl CrowdHandle {
    fn refresh_views(&mut self) {
        self.views.clear();
        self.views.extend(self.sim.bodies.iter().map(BodyView::from));
    }

    /// Runs a text operation and folds its result into a count or error code.
    fn with_text(&mut self, text: &str, op: fn(&mut Simulation, &str) -> Result<usize, CrowdError>) -> i32 {
        let code = match op(&mut self.sim, text) {
            Ok(count) => i32::try_from(count).unwrap_or(i32::MAX),
            Err(CrowdError::NoGlyphs) => CROWD_NO_GLYPHS,
            Err(CrowdError::CapacityReached { .. }) => CROWD_CAPACITY_REACHED,
        };
        self.refresh_views();
        code
    }
}

/// Borrows `len` bytes at `text` as UTF-8.
unsafe fn text_arg<'a>(text: *const u8, len: usize) -> Option<&'a str> {
    if text.is_null() {
        return None;
    }
    let bytes = unsafe { std::slice::from_raw_parts(text, len) };
    std::str::from_utf8(bytes).ok()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_Create() -> *mut CrowdHandle {
    Box::into_raw(Box::new(CrowdHandle::default()))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_CreateSeeded(seed: u64) -> *mut CrowdHandle {
    Box::into_raw(Box::new(CrowdHandle {
        sim: Simulation::seeded(seed),
        views: Vec::new(),
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_Destroy(handle: *mut CrowdHandle) {
    if !handle.is_null() {
        unsafe { drop(Box::from_raw(handle)) };
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_Step(handle: *mut CrowdHandle) {
    if let Some(crowd) = unsafe { handle.as_mut() } {
        crowd.sim.step();
        crowd.refresh_views();
    }
}

/// Returns the new body's id, or 0 if the handle or glyph is invalid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_Spawn(
    handle: *mut CrowdHandle,
    glyph: u32,
    start_x: f32,
    start_y: f32,
    target_x: f32,
    target_y: f32,
) -> u64 {
    let Some(crowd) = (unsafe { handle.as_mut() }) else {
        return 0;
    };
    let Some(glyph) = char::from_u32(glyph) else {
        return 0;
    };
    let id = crowd
        .sim
        .spawn(glyph, Vec2::new(start_x, start_y), Vec2::new(target_x, target_y));
    crowd.refresh_views();
    id.0
}

/// Replaces the crowd with the glyphs of a UTF-8 string. Returns how many
/// glyphs will be spawned, or a negative `CROWD_*` code.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_Gather(handle: *mut CrowdHandle, text: *const u8, len: usize) -> i32 {
    let (Some(crowd), Some(text)) = (unsafe { handle.as_mut() }, unsafe { text_arg(text, len) }) else {
        return CROWD_INVALID_ARGUMENT;
    };
    crowd.with_text(text, Simulation::gather)
}

/// Adds the glyphs of a UTF-8 string up to capacity. Returns how many were
/// added, or a negative `CROWD_*` code.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_Add(handle: *mut CrowdHandle, text: *const u8, len: usize) -> i32 {
    let (Some(crowd), Some(text)) = (unsafe { handle.as_mut() }, unsafe { text_arg(text, len) }) else {
        return CROWD_INVALID_ARGUMENT;
    };
    crowd.with_text(text, Simulation::add)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_Clear(handle: *mut CrowdHandle) {
    if let Some(crowd) = unsafe { handle.as_mut() } {
        crowd.sim.clear();
        crowd.refresh_views();
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_Remove(handle: *mut CrowdHandle, id: u64) -> bool {
    let Some(crowd) = (unsafe { handle.as_mut() }) else {
        return false;
    };
    let removed = crowd.sim.remove(BodyId(id));
    crowd.refresh_views();
    removed
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_ExplodeAll(handle: *mut CrowdHandle) {
    if let Some(crowd) = unsafe { handle.as_mut() } {
        crowd.sim.explode_all();
        crowd.refresh_views();
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_ApplyImpulse(handle: *mut CrowdHandle, x: f32, y: f32) -> usize {
    unsafe { handle.as_mut() }.map_or(0, |crowd| crowd.sim.apply_impulse(Vec2::new(x, y)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_SetRepulsion(handle: *mut CrowdHandle, repulsion: i32) {
    if let Some(crowd) = unsafe { handle.as_mut() } {
        crowd.sim.set_repulsion(repulsion);
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_SetCharacterSize(handle: *mut CrowdHandle, size: i32) {
    if let Some(crowd) = unsafe { handle.as_mut() } {
        crowd.sim.set_character_size(size);
        crowd.refresh_views();
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_GetBodyCount(handle: *const CrowdHandle) -> usize {
    unsafe { handle.as_ref() }.map_or(0, |crowd| crowd.views.len())
}

/// Views as of the last mutating call. Valid until the next call on `handle`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Crowd_GetBodies(handle: *const CrowdHandle) -> *const BodyView {
    unsafe { handle.as_ref() }.map_or(std::ptr::null(), |crowd| crowd.views.as_ptr())
}
