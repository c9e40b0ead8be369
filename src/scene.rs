use crate::timer::Millis;

/// Distance the car covers before it stops at the order window
pub const CAR_TRACK_LENGTH: u16 = 40;
const CAR_STEP: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scene {
    /// Drive-thru window where the customer places the order
    #[default]
    Order,
    /// Kitchen where the player shows the code
    Prep,
}

impl Scene {
    pub fn other(self) -> Scene {
        match self {
            Scene::Order => Scene::Prep,
            Scene::Prep => Scene::Order,
        }
    }
}

/// Drive-thru window with a car rolling up to it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderScene {
    car_position: u16,
    paused: bool,
}

impl OrderScene {
    fn advance(&mut self) {
        if self.paused {
            return;
        }
        self.car_position = (self.car_position + CAR_STEP).min(CAR_TRACK_LENGTH);
    }

    fn restart(&mut self) {
        self.car_position = 0;
    }

    fn car_arrived(&self) -> bool {
        self.car_position >= CAR_TRACK_LENGTH
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepScene {
    frame: u64,
    paused: bool,
}

impl PrepScene {
    fn advance(&mut self) {
        if !self.paused {
            self.frame += 1;
        }
    }
}

/// Round data a frame needs, supplied by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundView {
    pub remaining_ms: Millis,
    pub order_active: bool,
    pub show_validate: bool,
}

/// Everything the renderer needs to draw one scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub scene: Scene,
    pub paused: bool,
    pub remaining_ms: Millis,
    pub car_position: u16,
    pub car_arrived: bool,
    pub show_order: bool,
    pub show_validate: bool,
    pub animation_frame: u64,
}

/// Owns both scenes and which one is visible
#[derive(Debug, Clone, Default)]
pub struct SceneController {
    active: Scene,
    order: OrderScene,
    prep: PrepScene,
}

impl SceneController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_scene(&self) -> Scene {
        self.active
    }

    pub fn toggle_scene(&mut self) -> Scene {
        self.active = self.active.other();
        self.active
    }

    pub fn show(&mut self, scene: Scene) {
        self.active = scene;
    }

    /// Applies to both scenes, visible or not.
    pub fn set_paused(&mut self, paused: bool) {
        self.order.paused = paused;
        self.prep.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.order.paused
    }

    /// One animation step for each scene
    pub fn advance(&mut self) {
        self.order.advance();
        self.prep.advance();
    }

    /// A new customer pulls in
    pub fn restart_order(&mut self) {
        self.order.restart();
    }

    pub fn render(&self, scene: Scene, view: RoundView) -> Frame {
        let (show_order, show_validate, animation_frame) = match scene {
            Scene::Order => (view.order_active, false, self.order.car_position as u64),
            Scene::Prep => (false, view.show_validate, self.prep.frame),
        };

        Frame {
            scene,
            paused: self.is_paused(),
            remaining_ms: view.remaining_ms,
            car_position: self.order.car_position,
            car_arrived: self.order.car_arrived(),
            show_order,
            show_validate,
            animation_frame,
        }
    }
}
