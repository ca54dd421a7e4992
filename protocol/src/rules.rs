//! 规则引擎
//!
//! 纯函数集合：发牌、先手判定、落子合法性、卡住与流局判定。
//! 不持有任何状态，随机性全部来自调用方提供的 Rng。

use rand::seq::SliceRandom;
use rand::Rng;

use crate::board::{Board, BoardEnd};
use crate::constants::{FULL_SET_SIZE, HAND_SIZE, MAX_PIP};
use crate::tile::{Seat, Tile};

/// 发牌结果：两手牌 + 牌池
#[derive(Debug, Clone)]
pub struct Deal {
    /// 按座位下标排列的手牌
    pub hands: [Vec<Tile>; 2],
    /// 未发出的牌
    pub pool: Vec<Tile>,
}

/// 先手判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening {
    /// 先手座位
    pub starter: Seat,
    /// 首步必须打出的对子点数（双方都无对子时为 None，首步不受限）
    pub required_double: Option<u8>,
}

/// 规则引擎
pub struct RuleEngine;

impl RuleEngine {
    /// 生成整套双六骨牌（0-0 到 6-6，共 28 张）
    pub fn full_set() -> Vec<Tile> {
        let mut tiles = Vec::with_capacity(FULL_SET_SIZE);
        for left in 0..=MAX_PIP {
            for right in left..=MAX_PIP {
                tiles.push(Tile { left, right });
            }
        }
        tiles
    }

    /// 洗牌并发牌：每人 7 张，余下 14 张入池
    pub fn deal<R: Rng>(rng: &mut R) -> Deal {
        let mut tiles = Self::full_set();
        tiles.shuffle(rng);

        let pool = tiles.split_off(2 * HAND_SIZE);
        let guest = tiles.split_off(HAND_SIZE);

        Deal {
            hands: [tiles, guest],
            pool,
        }
    }

    /// 判定先手
    ///
    /// 持有最大对子（[6|6] 优先，依次递减）的一方先行，且首步必须打出
    /// 该对子。双方都没有对子时，手牌总点数高者先行（相同则房主先行），
    /// 此时首步不受限。同一张对子不会出现在两手牌中，判定是确定性的。
    pub fn choose_opening(hands: &[Vec<Tile>; 2]) -> Opening {
        for pip in (0..=MAX_PIP).rev() {
            for seat in [Seat::Host, Seat::Guest] {
                let held = hands[seat.index()]
                    .iter()
                    .any(|t| t.is_double() && t.left == pip);
                if held {
                    return Opening {
                        starter: seat,
                        required_double: Some(pip),
                    };
                }
            }
        }

        let host_sum: u32 = hands[Seat::Host.index()].iter().map(Tile::pip_sum).sum();
        let guest_sum: u32 = hands[Seat::Guest.index()].iter().map(Tile::pip_sum).sum();
        let starter = if guest_sum > host_sum {
            Seat::Guest
        } else {
            Seat::Host
        };

        Opening {
            starter,
            required_double: None,
        }
    }

    /// 候选落子是否合法
    ///
    /// 空链且开局约束未解除：只能打出指定对子，落子端不限。
    /// 空链无约束：任意牌合法。否则所选端的开放点数必须与牌任一端吻合；
    /// 两端都能落的牌由命令中的 side 明确指定，不做自动裁定。
    pub fn is_legal(tile: Tile, side: BoardEnd, board: &Board, required_double: Option<u8>) -> bool {
        if board.is_empty() {
            return match required_double {
                Some(pip) => tile.is_double() && tile.left == pip,
                None => true,
            };
        }
        match board.end(side) {
            Some(open) => tile.matches(open),
            None => false,
        }
    }

    /// 手牌中是否存在任一合法落子
    pub fn has_legal_move(hand: &[Tile], board: &Board, required_double: Option<u8>) -> bool {
        hand.iter().any(|t| {
            Self::is_legal(*t, BoardEnd::Left, board, required_double)
                || Self::is_legal(*t, BoardEnd::Right, board, required_double)
        })
    }

    /// 流局判定：牌池已空且双方都无合法落子
    pub fn is_blocked(
        hands: &[Vec<Tile>; 2],
        pool_count: usize,
        board: &Board,
        required_double: Option<u8>,
    ) -> bool {
        pool_count == 0
            && !Self::has_legal_move(&hands[Seat::Host.index()], board, required_double)
            && !Self::has_legal_move(&hands[Seat::Guest.index()], board, required_double)
    }

    /// 流局胜负：手牌总点数低者胜，点数相同为平局
    pub fn blocked_winner(hands: &[Vec<Tile>; 2]) -> Option<Seat> {
        let host: u32 = hands[Seat::Host.index()].iter().map(Tile::pip_sum).sum();
        let guest: u32 = hands[Seat::Guest.index()].iter().map(Tile::pip_sum).sum();
        if host < guest {
            Some(Seat::Host)
        } else if guest < host {
            Some(Seat::Guest)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn tile(left: u8, right: u8) -> Tile {
        Tile { left, right }
    }

    #[test]
    fn test_full_set_is_28_unique() {
        let set = RuleEngine::full_set();
        assert_eq!(set.len(), FULL_SET_SIZE);

        let unique: HashSet<(u8, u8)> = set.iter().map(|t| (t.left, t.right)).collect();
        assert_eq!(unique.len(), FULL_SET_SIZE);
        assert!(set.iter().all(|t| t.left <= t.right));
    }

    #[test]
    fn test_deal_partitions_full_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let deal = RuleEngine::deal(&mut rng);

        assert_eq!(deal.hands[0].len(), HAND_SIZE);
        assert_eq!(deal.hands[1].len(), HAND_SIZE);
        assert_eq!(deal.pool.len(), FULL_SET_SIZE - 2 * HAND_SIZE);

        // 手牌 + 牌池应恰好还原整套牌，无重复无遗漏
        let mut all: Vec<(u8, u8)> = deal
            .hands
            .iter()
            .flatten()
            .chain(deal.pool.iter())
            .map(|t| (t.left.min(t.right), t.left.max(t.right)))
            .collect();
        all.sort_unstable();

        let mut expected: Vec<(u8, u8)> = RuleEngine::full_set()
            .iter()
            .map(|t| (t.left, t.right))
            .collect();
        expected.sort_unstable();

        assert_eq!(all, expected);
    }

    #[test]
    fn test_deal_deterministic_with_seed() {
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let deal_a = RuleEngine::deal(&mut rng_a);
        let deal_b = RuleEngine::deal(&mut rng_b);
        assert_eq!(deal_a.hands[0], deal_b.hands[0]);
        assert_eq!(deal_a.hands[1], deal_b.hands[1]);
        assert_eq!(deal_a.pool, deal_b.pool);
    }

    #[test]
    fn test_opening_prefers_highest_double() {
        let hands = [
            vec![tile(3, 3), tile(1, 2)],
            vec![tile(5, 5), tile(0, 1)],
        ];
        let opening = RuleEngine::choose_opening(&hands);
        assert_eq!(opening.starter, Seat::Guest);
        assert_eq!(opening.required_double, Some(5));
    }

    #[test]
    fn test_opening_idempotent() {
        let hands = [
            vec![tile(6, 6), tile(1, 2)],
            vec![tile(5, 5), tile(0, 1)],
        ];
        assert_eq!(
            RuleEngine::choose_opening(&hands),
            RuleEngine::choose_opening(&hands)
        );
    }

    #[test]
    fn test_opening_fallback_without_doubles() {
        // 双方均无对子：总点数高者先行，首步不受限
        let hands = [
            vec![tile(0, 1), tile(1, 2)],
            vec![tile(5, 6), tile(4, 6)],
        ];
        let opening = RuleEngine::choose_opening(&hands);
        assert_eq!(opening.starter, Seat::Guest);
        assert_eq!(opening.required_double, None);

        // 总点数相同则房主先行
        let hands = [vec![tile(2, 4)], vec![tile(1, 5)]];
        let opening = RuleEngine::choose_opening(&hands);
        assert_eq!(opening.starter, Seat::Host);
        assert_eq!(opening.required_double, None);
    }

    #[test]
    fn test_opening_double_constrains_first_move() {
        let board = Board::new();
        // 约束未解除：只有 [6|6] 合法，落子端不限
        assert!(RuleEngine::is_legal(tile(6, 6), BoardEnd::Right, &board, Some(6)));
        assert!(RuleEngine::is_legal(tile(6, 6), BoardEnd::Left, &board, Some(6)));
        assert!(!RuleEngine::is_legal(tile(6, 5), BoardEnd::Right, &board, Some(6)));
        assert!(!RuleEngine::is_legal(tile(5, 5), BoardEnd::Right, &board, Some(6)));
        // 无约束的空链任意牌合法
        assert!(RuleEngine::is_legal(tile(2, 5), BoardEnd::Right, &board, None));
    }

    #[test]
    fn test_legality_against_open_ends() {
        let mut board = Board::new();
        board.place(tile(6, 6), BoardEnd::Right);
        board.place(tile(6, 3), BoardEnd::Right);
        // 链为 [6|6][6|3]，左端 6，右端 3
        assert!(RuleEngine::is_legal(tile(6, 1), BoardEnd::Left, &board, None));
        assert!(RuleEngine::is_legal(tile(1, 3), BoardEnd::Right, &board, None));
        assert!(!RuleEngine::is_legal(tile(1, 3), BoardEnd::Left, &board, None));
        assert!(!RuleEngine::is_legal(tile(2, 4), BoardEnd::Right, &board, None));
        // 两端都吻合的牌在两端都合法
        assert!(RuleEngine::is_legal(tile(6, 3), BoardEnd::Left, &board, None));
        assert!(RuleEngine::is_legal(tile(6, 3), BoardEnd::Right, &board, None));
    }

    #[test]
    fn test_has_legal_move() {
        let mut board = Board::new();
        board.place(tile(6, 6), BoardEnd::Right);
        assert!(RuleEngine::has_legal_move(
            &[tile(1, 2), tile(6, 0)],
            &board,
            None
        ));
        assert!(!RuleEngine::has_legal_move(
            &[tile(1, 2), tile(3, 4)],
            &board,
            None
        ));
    }

    #[test]
    fn test_blocked_detection_and_winner() {
        let mut board = Board::new();
        board.place(tile(6, 6), BoardEnd::Right);

        let hands = [vec![tile(1, 2)], vec![tile(3, 4), tile(0, 1)]];
        assert!(RuleEngine::is_blocked(&hands, 0, &board, None));
        // 牌池非空不算流局
        assert!(!RuleEngine::is_blocked(&hands, 3, &board, None));
        // 任一方还能行动不算流局
        let hands_movable = [vec![tile(6, 2)], vec![tile(3, 4)]];
        assert!(!RuleEngine::is_blocked(&hands_movable, 0, &board, None));

        // 点数低者胜
        assert_eq!(RuleEngine::blocked_winner(&hands), Some(Seat::Host));
        // 点数相同为平局
        let even = [vec![tile(1, 2)], vec![tile(0, 3)]];
        assert_eq!(RuleEngine::blocked_winner(&even), None);
    }
}
