//! 牌链状态

use serde::{Deserialize, Serialize};

use crate::tile::Tile;

/// 落子端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardEnd {
    /// 牌链左端
    Left,
    /// 牌链右端
    Right,
}

/// 桌面牌链：有序的已落骨牌序列
///
/// 不变式：相邻两张牌相接处的点数相等。`place` 负责维护该不变式，
/// 点数不匹配的落子会被整体拒绝。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    tiles: Vec<Tile>,
}

impl Board {
    /// 创建空牌链
    pub fn new() -> Self {
        Self { tiles: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// 已落的骨牌（含朝向）
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// 左端开放点数（空链为 None）
    pub fn left_end(&self) -> Option<u8> {
        self.tiles.first().map(|t| t.left)
    }

    /// 右端开放点数（空链为 None）
    pub fn right_end(&self) -> Option<u8> {
        self.tiles.last().map(|t| t.right)
    }

    /// 指定端的开放点数
    pub fn end(&self, end: BoardEnd) -> Option<u8> {
        match end {
            BoardEnd::Left => self.left_end(),
            BoardEnd::Right => self.right_end(),
        }
    }

    /// 将骨牌落到指定端，必要时翻转使相接点数吻合
    ///
    /// 空链时直接落下（落子端无意义）。点数不匹配返回 false，牌链不变。
    pub fn place(&mut self, tile: Tile, end: BoardEnd) -> bool {
        match end {
            BoardEnd::Left => match self.left_end() {
                None => {
                    self.tiles.push(tile);
                    true
                }
                Some(open) if tile.right == open => {
                    self.tiles.insert(0, tile);
                    true
                }
                Some(open) if tile.left == open => {
                    self.tiles.insert(0, tile.flipped());
                    true
                }
                Some(_) => false,
            },
            BoardEnd::Right => match self.right_end() {
                None => {
                    self.tiles.push(tile);
                    true
                }
                Some(open) if tile.left == open => {
                    self.tiles.push(tile);
                    true
                }
                Some(open) if tile.right == open => {
                    self.tiles.push(tile.flipped());
                    true
                }
                Some(_) => false,
            },
        }
    }

    /// 检查链不变式：所有相邻牌相接点数相等
    pub fn is_chained(&self) -> bool {
        self.tiles
            .windows(2)
            .all(|pair| pair[0].right == pair[1].left)
    }
}
