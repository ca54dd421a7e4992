//! 房间与对局状态机

use std::collections::HashMap;

use rand::Rng;

use protocol::{
    Board, BoardEnd, DominoError, GameSnapshot, MatchPhase, Opening, PlayerBrief, PlayerId,
    RoomCode, RuleEngine, Seat, StartingInfo, Tile, ROOM_CODE_ALPHABET, ROOM_CODE_LEN,
    ROOM_CODE_MAX_ATTEMPTS,
};

/// 一局对战的全部可变状态
///
/// 手牌、牌链、牌池、回合指针、阶段只由本会话的命令修改；
/// 规则引擎只读快照。每次成功变更使 `version` 自增，
/// 回合协调器据此判断延迟动作是否已失效。
pub struct MatchSession {
    pub code: RoomCode,
    pub phase: MatchPhase,
    /// 座位 -> 玩家 ID（下标即 Seat::index）
    pub seats: [Option<PlayerId>; 2],
    /// 座位 -> 显示名
    pub names: [String; 2],
    /// 座位 -> 手牌
    pub hands: [Vec<Tile>; 2],
    pub board: Board,
    /// 牌池（未发出的牌）
    pub pool: Vec<Tile>,
    /// 当前行动座位
    pub turn: Seat,
    /// 开局对子约束，首张落下后解除
    pub required_double: Option<u8>,
    pub starting_info: Option<StartingInfo>,
    /// 胜者座位（流局平局时对局结束但无胜者）
    pub winner: Option<Seat>,
    /// 状态版本号，每次成功变更自增
    pub version: u64,
}

impl MatchSession {
    /// 创建 Lobby 阶段的新对局，房主入座
    pub fn new(code: RoomCode, creator: PlayerId, name: String) -> Self {
        Self {
            code,
            phase: MatchPhase::Lobby,
            seats: [Some(creator), None],
            names: [name, String::new()],
            hands: [Vec::new(), Vec::new()],
            board: Board::new(),
            pool: Vec::new(),
            turn: Seat::Host,
            required_double: None,
            starting_info: None,
            winner: None,
            version: 0,
        }
    }

    /// 玩家所在座位
    pub fn seat_of(&self, player: PlayerId) -> Option<Seat> {
        if self.seats[Seat::Host.index()] == Some(player) {
            Some(Seat::Host)
        } else if self.seats[Seat::Guest.index()] == Some(player) {
            Some(Seat::Guest)
        } else {
            None
        }
    }

    /// 指定座位的玩家 ID
    pub fn player_at(&self, seat: Seat) -> Option<PlayerId> {
        self.seats[seat.index()]
    }

    /// 座位显示名
    pub fn name_of(&self, seat: Seat) -> &str {
        &self.names[seat.index()]
    }

    pub fn is_full(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    pub fn is_empty(&self) -> bool {
        self.seats.iter().all(Option::is_none)
    }

    /// 在座玩家（广播目标）
    pub fn seated_players(&self) -> Vec<PlayerId> {
        self.seats.iter().flatten().copied().collect()
    }

    /// 当前行动方的玩家 ID（非进行中或座位已空置为 None）
    pub fn current_player(&self) -> Option<PlayerId> {
        if self.phase == MatchPhase::Active {
            self.player_at(self.turn)
        } else {
            None
        }
    }

    pub fn pool_count(&self) -> usize {
        self.pool.len()
    }

    /// 胜者显示名
    pub fn winner_name(&self) -> Option<String> {
        self.winner.map(|seat| self.name_of(seat).to_string())
    }

    /// 第二位玩家入座并开始对局（发牌、判定先手）
    pub fn join<R: Rng>(
        &mut self,
        player: PlayerId,
        name: String,
        rng: &mut R,
    ) -> Result<(), DominoError> {
        if self.phase != MatchPhase::Lobby {
            return Err(DominoError::AlreadyStarted);
        }
        if self.is_full() {
            return Err(DominoError::RoomFull);
        }

        self.seats[Seat::Guest.index()] = Some(player);
        self.names[Seat::Guest.index()] = name;
        self.start(rng);
        Ok(())
    }

    /// 发牌并进入 Active 阶段
    fn start<R: Rng>(&mut self, rng: &mut R) {
        let deal = RuleEngine::deal(rng);
        self.hands = deal.hands;
        self.pool = deal.pool;

        let opening = RuleEngine::choose_opening(&self.hands);
        self.turn = opening.starter;
        self.required_double = opening.required_double;
        self.starting_info = Some(self.describe_opening(&opening));
        self.phase = MatchPhase::Active;
        self.bump();
    }

    /// 开局说明文案
    fn describe_opening(&self, opening: &Opening) -> StartingInfo {
        let name = self.name_of(opening.starter);
        let message = match opening.required_double {
            Some(pip) => format!(
                "{name} 持有最大的对子 [{pip}|{pip}]，先行并且必须首先打出这张对子"
            ),
            None => format!("双方都没有对子，由 {name} 先行，可打出任意一张牌"),
        };
        StartingInfo {
            message,
            highest_double: opening.required_double,
        }
    }

    /// 落子命令
    ///
    /// 成功后：牌离手、牌链更新、开局约束解除；手牌清空即获胜，
    /// 否则回合交给对方。
    pub fn play_move(
        &mut self,
        player: PlayerId,
        tile: Tile,
        side: BoardEnd,
    ) -> Result<(), DominoError> {
        self.ensure_active()?;
        let seat = self.seat_of(player).ok_or(DominoError::NotYourTurn)?;
        if seat != self.turn {
            return Err(DominoError::NotYourTurn);
        }

        // 手牌中查找这张牌（两种朝向视为同一张）
        let hand = &self.hands[seat.index()];
        let idx = hand
            .iter()
            .position(|t| t.same_tile(tile))
            .ok_or_else(|| DominoError::IllegalMove {
                reason: "这张牌不在你的手牌中".to_string(),
            })?;
        let held = hand[idx];

        if !RuleEngine::is_legal(held, side, &self.board, self.required_double) {
            return Err(DominoError::IllegalMove {
                reason: "这张牌不能落在该端".to_string(),
            });
        }

        self.hands[seat.index()].remove(idx);
        // is_legal 已保证点数吻合，place 必然成功
        self.board.place(held, side);
        self.required_double = None;

        if self.hands[seat.index()].is_empty() {
            self.finish(Some(seat));
        } else {
            self.turn = seat.opponent();
        }
        self.bump();
        Ok(())
    }

    /// 摸牌命令：只有无合法落子时才允许，回合不交换
    pub fn draw_from_pool<R: Rng>(
        &mut self,
        player: PlayerId,
        rng: &mut R,
    ) -> Result<Tile, DominoError> {
        self.ensure_active()?;
        let seat = self.seat_of(player).ok_or(DominoError::NotYourTurn)?;
        if seat != self.turn {
            return Err(DominoError::NotYourTurn);
        }
        if self.pool.is_empty() {
            return Err(DominoError::PoolEmpty);
        }
        if RuleEngine::has_legal_move(&self.hands[seat.index()], &self.board, self.required_double)
        {
            return Err(DominoError::IllegalMove {
                reason: "还有可落的牌，不能摸牌".to_string(),
            });
        }

        let idx = rng.gen_range(0..self.pool.len());
        let tile = self.pool.swap_remove(idx);
        self.hands[seat.index()].push(tile);
        self.bump();
        Ok(tile)
    }

    /// 过牌命令：只有牌池已空且无合法落子时才允许
    ///
    /// 过牌后若对方同样无法行动，对局以流局结束。
    pub fn pass_turn(&mut self, player: PlayerId) -> Result<(), DominoError> {
        self.ensure_active()?;
        let seat = self.seat_of(player).ok_or(DominoError::NotYourTurn)?;
        if seat != self.turn {
            return Err(DominoError::NotYourTurn);
        }
        if !self.pool.is_empty() {
            return Err(DominoError::IllegalMove {
                reason: "牌池还有牌，应先摸牌".to_string(),
            });
        }
        if RuleEngine::has_legal_move(&self.hands[seat.index()], &self.board, self.required_double)
        {
            return Err(DominoError::IllegalMove {
                reason: "还有可落的牌，不能过".to_string(),
            });
        }

        self.turn = seat.opponent();
        if RuleEngine::is_blocked(&self.hands, self.pool.len(), &self.board, self.required_double)
        {
            self.finish(RuleEngine::blocked_winner(&self.hands));
        }
        self.bump();
        Ok(())
    }

    /// 当前行动方是否无任何合法落子（回合协调器据此调度自动动作）
    pub fn active_player_stuck(&self) -> bool {
        if self.phase != MatchPhase::Active {
            return false;
        }
        // 座位已空置（对手中途离开）时不调度自动动作
        if self.player_at(self.turn).is_none() {
            return false;
        }
        !RuleEngine::has_legal_move(
            &self.hands[self.turn.index()],
            &self.board,
            self.required_double,
        )
    }

    /// 玩家离开，空出座位
    pub fn vacate(&mut self, player: PlayerId) -> Option<Seat> {
        let seat = self.seat_of(player)?;
        self.seats[seat.index()] = None;
        self.bump();
        Some(seat)
    }

    /// 对局结束文案
    pub fn finish_summary(&self) -> String {
        match self.winner {
            Some(seat) if self.hands[seat.index()].is_empty() => {
                format!("{} 赢得了对局！", self.name_of(seat))
            }
            Some(seat) => format!(
                "双方都无法行动，{} 以更低的手牌点数获胜",
                self.name_of(seat)
            ),
            None => "双方都无法行动，手牌点数相同，双方平局".to_string(),
        }
    }

    /// 生成发给指定玩家的过滤快照（手牌只含本人的）
    pub fn snapshot_for(&self, recipient: PlayerId) -> GameSnapshot {
        let mut players = HashMap::new();
        for seat in [Seat::Host, Seat::Guest] {
            if let Some(id) = self.player_at(seat) {
                players.insert(
                    id,
                    PlayerBrief {
                        name: self.name_of(seat).to_string(),
                        hand_count: self.hands[seat.index()].len(),
                    },
                );
            }
        }

        let my_hand = self
            .seat_of(recipient)
            .map(|seat| self.hands[seat.index()].clone())
            .unwrap_or_default();

        GameSnapshot {
            room_code: self.code.clone(),
            players,
            my_hand,
            board: self.board.tiles().to_vec(),
            current_player: self.current_player(),
            pool_count: self.pool.len(),
            starting_info: self.starting_info.clone(),
            required_double: self.required_double,
            game_finished: self.phase == MatchPhase::Finished,
            winner: self.winner_name(),
        }
    }

    fn finish(&mut self, winner: Option<Seat>) {
        self.phase = MatchPhase::Finished;
        self.winner = winner;
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    fn ensure_active(&self) -> Result<(), DominoError> {
        match self.phase {
            MatchPhase::Active => Ok(()),
            MatchPhase::Finished => Err(DominoError::GameFinished),
            MatchPhase::Lobby => Err(DominoError::IllegalMove {
                reason: "对局尚未开始".to_string(),
            }),
        }
    }
}

/// 房间注册表：房间码 -> 对局
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, MatchSession>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// 规范化房间码：去空白并转大写，空码视为非法
    pub fn normalize(code: &str) -> Result<RoomCode, DominoError> {
        let code = code.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(DominoError::InvalidCode);
        }
        Ok(code)
    }

    /// 生成未被占用的房间码
    ///
    /// 重试次数耗尽返回 CapacityExhausted（实际上几乎不可能，
    /// 但必须作为错误处理而不是假设不会发生）。
    fn generate_code<R: Rng>(&self, rng: &mut R) -> Result<RoomCode, DominoError> {
        for _ in 0..ROOM_CODE_MAX_ATTEMPTS {
            let code: RoomCode = (0..ROOM_CODE_LEN)
                .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
                .collect();
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(DominoError::CapacityExhausted)
    }

    /// 创建房间，房主入座，返回房间码
    pub fn create<R: Rng>(
        &mut self,
        creator: PlayerId,
        name: String,
        rng: &mut R,
    ) -> Result<RoomCode, DominoError> {
        let code = self.generate_code(rng)?;
        let session = MatchSession::new(code.clone(), creator, name);
        self.rooms.insert(code.clone(), session);
        Ok(code)
    }

    /// 获取房间
    pub fn get(&self, code: &str) -> Option<&MatchSession> {
        self.rooms.get(code)
    }

    /// 获取房间（可变）
    pub fn get_mut(&mut self, code: &str) -> Option<&mut MatchSession> {
        self.rooms.get_mut(code)
    }

    /// 移除房间
    pub fn remove(&mut self, code: &str) -> Option<MatchSession> {
        self.rooms.remove(code)
    }

    /// 房间数量
    pub fn count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
