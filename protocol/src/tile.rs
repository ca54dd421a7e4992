//! 骨牌定义

use serde::{Deserialize, Serialize};

use crate::constants::MAX_PIP;

/// 一张骨牌：一对无序的点数，落到牌链上时才确定朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub left: u8,
    pub right: u8,
}

impl Tile {
    /// 创建骨牌，任一端点数超出 0..=6 时返回 None
    pub fn new(left: u8, right: u8) -> Option<Tile> {
        if left <= MAX_PIP && right <= MAX_PIP {
            Some(Tile { left, right })
        } else {
            None
        }
    }

    /// 是否为对子
    pub fn is_double(&self) -> bool {
        self.left == self.right
    }

    /// 翻转朝向后的骨牌
    pub fn flipped(&self) -> Tile {
        Tile {
            left: self.right,
            right: self.left,
        }
    }

    /// 两端点数之和
    pub fn pip_sum(&self) -> u32 {
        self.left as u32 + self.right as u32
    }

    /// 任一端是否为指定点数
    pub fn matches(&self, pip: u8) -> bool {
        self.left == pip || self.right == pip
    }

    /// 是否为同一张牌（忽略朝向）
    pub fn same_tile(&self, other: Tile) -> bool {
        (self.left == other.left && self.right == other.right)
            || (self.left == other.right && self.right == other.left)
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}|{}]", self.left, self.right)
    }
}

/// 座位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    /// 房主（建房者，先入座）
    Host,
    /// 加入者
    Guest,
}

impl Seat {
    /// 对面座位
    pub fn opponent(&self) -> Seat {
        match self {
            Seat::Host => Seat::Guest,
            Seat::Guest => Seat::Host,
        }
    }

    /// 座位下标（手牌数组等按此索引）
    pub fn index(&self) -> usize {
        match self {
            Seat::Host => 0,
            Seat::Guest => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_new_bounds() {
        assert!(Tile::new(0, 6).is_some());
        assert!(Tile::new(6, 6).is_some());
        assert!(Tile::new(7, 0).is_none());
        assert!(Tile::new(0, 7).is_none());
    }

    #[test]
    fn test_tile_flip() {
        let tile = Tile { left: 2, right: 5 };
        assert_eq!(tile.flipped(), Tile { left: 5, right: 2 });
        assert_eq!(tile.flipped().flipped(), tile);
    }

    #[test]
    fn test_tile_same_ignores_orientation() {
        let a = Tile { left: 2, right: 5 };
        let b = Tile { left: 5, right: 2 };
        assert!(a.same_tile(b));
        assert!(a.same_tile(a));
        assert!(!a.same_tile(Tile { left: 2, right: 4 }));
    }

    #[test]
    fn test_tile_helpers() {
        let double = Tile { left: 3, right: 3 };
        assert!(double.is_double());
        assert_eq!(double.pip_sum(), 6);
        assert!(double.matches(3));
        assert!(!double.matches(4));
        assert_eq!(double.to_string(), "[3|3]");
    }

    #[test]
    fn test_seat_opponent() {
        assert_eq!(Seat::Host.opponent(), Seat::Guest);
        assert_eq!(Seat::Guest.opponent(), Seat::Host);
        assert_ne!(Seat::Host.index(), Seat::Guest.index());
    }
}
