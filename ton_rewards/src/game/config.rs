//! Static per-game descriptors shown to clients before they play.

use rust_decimal::Decimal;
use serde::Serialize;

use super::models::GameType;
use crate::wallet::Funds;

/// Prize table of the wheel, one list per currency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrizeTable {
    pub ton: Vec<Decimal>,
    pub gems: Vec<i64>,
    pub diamonds: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Game-specific rules
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GameRules {
    Wheel {
        max_spins_per_day: u32,
        prizes: PrizeTable,
    },
    Drop {
        max_plays_per_day: u32,
        difficulty_levels: Vec<Difficulty>,
        /// Score multiplier per difficulty, in `difficulty_levels` order
        score_multipliers: Vec<(Difficulty, Decimal)>,
    },
}

/// Client-facing descriptor of a game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameConfig {
    pub game_type: GameType,
    pub name: &'static str,
    pub description: &'static str,
    /// Entry cost; informational, not debited by the session flow
    pub cost: Funds,
    #[serde(flatten)]
    pub rules: GameRules,
}

impl GameConfig {
    pub fn for_game(game_type: GameType) -> Self {
        match game_type {
            GameType::Spin => GameConfig {
                game_type,
                name: "TON Wheel",
                description: "Spin the wheel to win TON, gems, and diamonds!",
                cost: Funds::gems(10),
                rules: GameRules::Wheel {
                    max_spins_per_day: 50,
                    prizes: PrizeTable {
                        ton: vec![
                            Decimal::new(1, 3),
                            Decimal::new(5, 3),
                            Decimal::new(1, 2),
                            Decimal::new(5, 2),
                            Decimal::new(1, 1),
                        ],
                        gems: vec![10, 25, 50, 100, 200],
                        diamonds: vec![1, 2, 5, 10, 20],
                    },
                },
            },
            GameType::Drop => GameConfig {
                game_type,
                name: "TON Drop",
                description: "Catch falling TON coins and avoid obstacles!",
                cost: Funds::gems(5),
                rules: GameRules::Drop {
                    max_plays_per_day: 100,
                    difficulty_levels: vec![Difficulty::Easy, Difficulty::Medium, Difficulty::Hard],
                    score_multipliers: vec![
                        (Difficulty::Easy, Decimal::ONE),
                        (Difficulty::Medium, Decimal::new(15, 1)),
                        (Difficulty::Hard, Decimal::TWO),
                    ],
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_descriptor() {
        let config = GameConfig::for_game(GameType::Spin);
        assert_eq!(config.name, "TON Wheel");
        assert_eq!(config.cost, Funds::gems(10));

        let GameRules::Wheel { prizes, .. } = config.rules else {
            panic!("spin must use wheel rules");
        };
        assert_eq!(prizes.ton.len(), 5);
        assert_eq!(prizes.ton[4], Decimal::new(1, 1));
    }

    #[test]
    fn test_drop_descriptor_serializes_flat() {
        let json = serde_json::to_value(GameConfig::for_game(GameType::Drop)).unwrap();
        assert_eq!(json["name"], "TON Drop");
        assert_eq!(json["max_plays_per_day"], 100);
        assert_eq!(json["difficulty_levels"][2], "hard");
    }
}
