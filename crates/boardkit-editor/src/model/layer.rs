use serde::{Deserialize, Serialize};

/// Board layers known to the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerId {
    TopCopper,
    Inner1,
    Inner2,
    Inner3,
    Inner4,
    BottomCopper,
    TopSilkscreen,
    BottomSilkscreen,
    BoardOutline,
    Documentation,
}

impl LayerId {
    pub const ALL: [LayerId; 10] = [
        LayerId::TopCopper,
        LayerId::Inner1,
        LayerId::Inner2,
        LayerId::Inner3,
        LayerId::Inner4,
        LayerId::BottomCopper,
        LayerId::TopSilkscreen,
        LayerId::BottomSilkscreen,
        LayerId::BoardOutline,
        LayerId::Documentation,
    ];

    /// Copper layers from top to bottom.
    pub const COPPER: [LayerId; 6] = [
        LayerId::TopCopper,
        LayerId::Inner1,
        LayerId::Inner2,
        LayerId::Inner3,
        LayerId::Inner4,
        LayerId::BottomCopper,
    ];

    pub fn is_copper(self) -> bool {
        Self::COPPER.contains(&self)
    }

    pub fn is_silkscreen(self) -> bool {
        matches!(self, LayerId::TopSilkscreen | LayerId::BottomSilkscreen)
    }

    pub fn is_bottom(self) -> bool {
        matches!(self, LayerId::BottomCopper | LayerId::BottomSilkscreen)
    }

    /// The same layer on the other board side. Inner and non-sided layers map to themselves.
    pub fn opposite_side(self) -> LayerId {
        match self {
            LayerId::TopCopper => LayerId::BottomCopper,
            LayerId::BottomCopper => LayerId::TopCopper,
            LayerId::TopSilkscreen => LayerId::BottomSilkscreen,
            LayerId::BottomSilkscreen => LayerId::TopSilkscreen,
            other => other,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LayerId::TopCopper => "Top Copper",
            LayerId::Inner1 => "Inner Copper 1",
            LayerId::Inner2 => "Inner Copper 2",
            LayerId::Inner3 => "Inner Copper 3",
            LayerId::Inner4 => "Inner Copper 4",
            LayerId::BottomCopper => "Bottom Copper",
            LayerId::TopSilkscreen => "Top Silkscreen",
            LayerId::BottomSilkscreen => "Bottom Silkscreen",
            LayerId::BoardOutline => "Board Outline",
            LayerId::Documentation => "Documentation",
        }
    }

    /// Short stable name used in approval identities and the CLI.
    pub fn key(self) -> &'static str {
        match self {
            LayerId::TopCopper => "top_cu",
            LayerId::Inner1 => "in1_cu",
            LayerId::Inner2 => "in2_cu",
            LayerId::Inner3 => "in3_cu",
            LayerId::Inner4 => "in4_cu",
            LayerId::BottomCopper => "bot_cu",
            LayerId::TopSilkscreen => "top_silk",
            LayerId::BottomSilkscreen => "bot_silk",
            LayerId::BoardOutline => "outline",
            LayerId::Documentation => "doc",
        }
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A layer of the board together with its user toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    /// Disabled layers cannot receive new objects
    pub enabled: bool,
    pub visible: bool,
}

impl Layer {
    /// Standard two layer stackup: inner copper layers are disabled.
    pub fn default_stackup() -> Vec<Layer> {
        LayerId::ALL
            .iter()
            .map(|&id| Layer {
                id,
                enabled: !matches!(
                    id,
                    LayerId::Inner1 | LayerId::Inner2 | LayerId::Inner3 | LayerId::Inner4
                ),
                visible: true,
            })
            .collect()
    }
}
