use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::code::Code;
use crate::error::{GameError, Result};
use crate::mode::{GameMode, Representation};

pub const DEFAULT_DEALS_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub code: Code,
}

impl MenuItem {
    pub fn new(id: &str, name: &str, code: u8) -> Option<Self> {
        Some(Self {
            id: id.to_string(),
            name: name.to_string(),
            code: Code::new(code)?,
        })
    }
}

/// Source of the full menu. Fetched wholesale, never mid-round.
pub trait CatalogProvider {
    fn fetch(&self) -> Vec<MenuItem>;
}

/// Menu bundled with the game
#[derive(Debug, Clone, Default)]
pub struct BuiltinMenu;

const BUILTIN_MENU: &[(&str, &str, u8)] = &[
    ("burger", "Burger", 3),
    ("cheeseburger", "Cheeseburger", 5),
    ("fries", "Fries", 6),
    ("nuggets", "Nuggets", 9),
    ("hotdog", "Hot Dog", 10),
    ("taco", "Taco", 12),
    ("pizza", "Pizza Slice", 14),
    ("wrap", "Chicken Wrap", 17),
    ("salad", "Salad", 19),
    ("donut", "Donut", 21),
    ("milkshake", "Milkshake", 22),
    ("icecream", "Ice Cream", 25),
    ("cola", "Cola", 27),
    ("coffee", "Coffee", 29),
    ("pancakes", "Pancakes", 31),
];

impl CatalogProvider for BuiltinMenu {
    fn fetch(&self) -> Vec<MenuItem> {
        BUILTIN_MENU
            .iter()
            .filter_map(|(id, name, code)| MenuItem::new(id, name, *code))
            .collect()
    }
}

/// Provider backed by a fixed list, handy for tests and custom menus
#[derive(Debug, Clone, Default)]
pub struct FixedMenu {
    items: Vec<MenuItem>,
}

impl FixedMenu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }
}

impl CatalogProvider for FixedMenu {
    fn fetch(&self) -> Vec<MenuItem> {
        self.items.clone()
    }
}

/// The slice of the menu currently on display
pub fn draw_deals<R: Rng + ?Sized>(items: &[MenuItem], count: usize, rng: &mut R) -> Vec<MenuItem> {
    let mut deals: Vec<MenuItem> = items.choose_multiple(rng, count).cloned().collect();
    deals.sort_by_key(|item| item.code);
    deals
}

/// What the player is asked to encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposedCode {
    Bits(Code),
    Decimal(u8),
}

impl ExposedCode {
    pub fn label(&self) -> String {
        match self {
            ExposedCode::Bits(code) => code.binary_string(),
            ExposedCode::Decimal(d) => d.to_string(),
        }
    }
}

/// The active customer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub item: MenuItem,
    pub code: Code,
    pub exposed: ExposedCode,
}

/// Pick the next order from the deals on display.
pub fn generate<R: Rng + ?Sized>(mode: GameMode, deals: &[MenuItem], rng: &mut R) -> Result<Order> {
    let item = deals.choose(rng).ok_or(GameError::CatalogUnavailable)?.clone();
    let code = item.code;
    let exposed = match mode.policy().exposed_as {
        Representation::Bits => ExposedCode::Bits(code),
        Representation::Decimal => ExposedCode::Decimal(code.decimal()),
    };
    debug!(item = %item.id, code = code.decimal(), %mode, "generated order");

    Ok(Order {
        item,
        code,
        exposed,
    })
}
