// Copyright (c) 2021 Andrew Gazelka - All Rights Reserved.
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use interfaces::types::SimpleType;
use serde::{Deserialize, Serialize};

/// The cost model of breaking blocks with whatever the agent currently holds
pub trait ToolModel {
    /// The ticks it takes to break a block of the given type. Infinite if it
    /// cannot be broken.
    fn break_ticks(&self, block: SimpleType) -> f64;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Material {
    Hand,
    Wood,
    Stone,
    Iron,
    Diamond,
    Gold,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ToolKind {
    Generic,
    Pickaxe,
    Shovel,
    Axe,
}

impl Material {
    pub const fn strength(self) -> f64 {
        match self {
            Self::Hand => 1.0,
            Self::Wood => 2.0,
            Self::Stone => 4.0,
            Self::Iron => 6.0,
            Self::Diamond => 8.0,
            Self::Gold => 12.0,
        }
    }
}

/// Without any block data we assume every solid block is stone-like
const SOLID_HARDNESS: f64 = 1.5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tool {
    pub material: Material,
    pub kind: ToolKind,
    pub efficiency: u32,
}

impl Default for Tool {
    fn default() -> Self {
        Self {
            material: Material::Hand,
            kind: ToolKind::Generic,
            efficiency: 0,
        }
    }
}

impl Tool {
    pub const fn new(kind: ToolKind, material: Material) -> Self {
        Self {
            material,
            kind,
            efficiency: 0,
        }
    }

    const fn hardness(block: SimpleType) -> Option<f64> {
        match block {
            SimpleType::Solid => Some(SOLID_HARDNESS),
            // there is nothing to break
            SimpleType::WalkThrough | SimpleType::Water => Some(0.0),
            SimpleType::Avoid => None,
        }
    }

    /// <https://minecraft.fandom.com/wiki/Breaking#Speed>
    fn strength_against_block(&self, block: SimpleType) -> f64 {
        let Some(hardness) = Self::hardness(block) else {
            return 0.0;
        };

        if hardness == 0.0 {
            return f64::INFINITY;
        }

        // stone-like blocks need a pickaxe to drop anything and are mined slower without one
        let effective = matches!(self.kind, ToolKind::Pickaxe) && self.material != Material::Hand;

        if !effective {
            return 1.0 / hardness / 100.0;
        }

        let mut d = self.material.strength();

        if self.efficiency > 0 {
            d += f64::from(self.efficiency.pow(2) + 1);
        }

        d / hardness / 30.0
    }
}

impl ToolModel for Tool {
    fn break_ticks(&self, block: SimpleType) -> f64 {
        let strength = self.strength_against_block(block);
        if strength == 0.0 {
            return f64::INFINITY;
        }
        if strength.is_infinite() {
            return 0.0;
        }
        (1.0 / strength).round()
    }
}

#[cfg(test)]
mod tests {
    use interfaces::types::SimpleType;
    use more_asserts::*;

    use crate::client::physics::tools::{Material, Tool, ToolKind, ToolModel};

    #[test]
    fn test_hand_breaks_stone_slowly() {
        let hand = Tool::default();
        assert_eq!(hand.break_ticks(SimpleType::Solid), 150.0);
    }

    #[test]
    fn test_better_tools_are_faster() {
        let wood = Tool::new(ToolKind::Pickaxe, Material::Wood).break_ticks(SimpleType::Solid);
        let diamond =
            Tool::new(ToolKind::Pickaxe, Material::Diamond).break_ticks(SimpleType::Solid);
        assert_ge!(wood, 22.0);
        assert_le!(wood, 23.0);
        assert_lt!(diamond, wood);

        let mut enchanted = Tool::new(ToolKind::Pickaxe, Material::Diamond);
        enchanted.efficiency = 5;
        assert_lt!(enchanted.break_ticks(SimpleType::Solid), diamond);
    }

    #[test]
    fn test_unbreakable() {
        let tool = Tool::new(ToolKind::Pickaxe, Material::Diamond);
        assert!(tool.break_ticks(SimpleType::Avoid).is_infinite());
        assert_eq!(tool.break_ticks(SimpleType::WalkThrough), 0.0);
        assert_eq!(tool.break_ticks(SimpleType::Water), 0.0);
    }
}
