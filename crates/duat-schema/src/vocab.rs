//! Closed vocabularies used by content files.
//!
//! Every enumerated field in a content file maps onto one of these enums, so
//! an unrecognized value fails deserialization instead of being carried as an
//! opaque string. Each vocabulary also exposes its wire names through
//! [`as_str`](ContentType::as_str), an `ALL` table in declaration order, and a
//! [`FromStr`](std::str::FromStr) impl for values that arrive untyped (effect
//! metadata, requirement predicates).

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant, )+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The name used in content files.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        vocabulary: $label,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

// ===========================================================================
// Content types
// ===========================================================================

vocabulary! {
    /// The four kinds of content, each stored in its own directory under the
    /// content root.
    pub enum ContentType ("content type") {
        Cards => "cards",
        Enemies => "enemies",
        Events => "events",
        Decks => "decks",
    }
}

impl ContentType {
    /// Directory name under the content root.
    pub fn dir_name(self) -> &'static str {
        self.as_str()
    }

    /// Singular, capitalized noun for messages ("Card 'x' ...").
    pub fn item_noun(self) -> &'static str {
        match self {
            ContentType::Cards => "Card",
            ContentType::Enemies => "Enemy",
            ContentType::Events => "Event",
            ContentType::Decks => "Deck",
        }
    }
}

// ===========================================================================
// Cards
// ===========================================================================

vocabulary! {
    pub enum CardType ("card type") {
        Attack => "attack",
        Skill => "skill",
        Power => "power",
        Curse => "curse",
        Blessing => "blessing",
    }
}

vocabulary! {
    pub enum Rarity ("rarity") {
        Common => "common",
        Uncommon => "uncommon",
        Rare => "rare",
        Epic => "epic",
        Legendary => "legendary",
    }
}

impl Default for Rarity {
    fn default() -> Self {
        Rarity::Common
    }
}

// ===========================================================================
// Effects
// ===========================================================================

vocabulary! {
    pub enum EffectType ("effect type") {
        Damage => "damage",
        Block => "block",
        Heal => "heal",
        DrawCards => "draw_cards",
        GainSand => "gain_sand",
        LoseSand => "lose_sand",
        Buff => "buff",
        Debuff => "debuff",
        Curse => "curse",
        Blessing => "blessing",
        UpgradeCard => "upgrade_card",
        TransformCard => "transform_card",
        DiscoverCard => "discover_card",
        GainCard => "gain_card",
        RemoveCard => "remove_card",
        GainGold => "gain_gold",
        LoseGold => "lose_gold",
        MaxHealthIncrease => "max_health_increase",
        PermanentSandIncrease => "permanent_sand_increase",
        ApplyPoison => "apply_poison",
        ApplyVulnerable => "apply_vulnerable",
        ApplyWeak => "apply_weak",
        ApplyStrength => "apply_strength",
        ApplyDexterity => "apply_dexterity",
        ChannelDivinity => "channel_divinity",
        InvokeRitual => "invoke_ritual",
    }
}

impl EffectType {
    /// Largest `value` an effect of this type may carry, if capped.
    pub fn value_ceiling(self) -> Option<u32> {
        match self {
            EffectType::Damage | EffectType::Heal => Some(999),
            EffectType::GainSand | EffectType::LoseSand => Some(6),
            EffectType::Block
            | EffectType::DrawCards
            | EffectType::Buff
            | EffectType::Debuff
            | EffectType::Curse
            | EffectType::Blessing
            | EffectType::UpgradeCard
            | EffectType::TransformCard
            | EffectType::DiscoverCard
            | EffectType::GainCard
            | EffectType::RemoveCard
            | EffectType::GainGold
            | EffectType::LoseGold
            | EffectType::MaxHealthIncrease
            | EffectType::PermanentSandIncrease
            | EffectType::ApplyPoison
            | EffectType::ApplyVulnerable
            | EffectType::ApplyWeak
            | EffectType::ApplyStrength
            | EffectType::ApplyDexterity
            | EffectType::ChannelDivinity
            | EffectType::InvokeRitual => None,
        }
    }

    /// The metadata key whose value must come from a closed reference
    /// vocabulary for this effect type.
    pub fn metadata_vocabulary(self) -> Option<MetadataVocabulary> {
        match self {
            EffectType::Blessing => Some(MetadataVocabulary::Blessing),
            EffectType::Curse => Some(MetadataVocabulary::Curse),
            EffectType::Buff => Some(MetadataVocabulary::Buff),
            EffectType::Debuff => Some(MetadataVocabulary::Debuff),
            _ => None,
        }
    }
}

vocabulary! {
    pub enum TargetType ("target") {
        SelfTarget => "self",
        Enemy => "enemy",
        Player => "player",
        AllEnemies => "all_enemies",
        RandomEnemy => "random_enemy",
        WeakestEnemy => "weakest_enemy",
        StrongestEnemy => "strongest_enemy",
    }
}

// ===========================================================================
// Keywords
// ===========================================================================

vocabulary! {
    pub enum Keyword ("keyword") {
        // Combat
        Strike => "strike",
        Defense => "defense",
        Fire => "fire",
        Poison => "poison",
        Cantrip => "cantrip",
        Ethereal => "ethereal",
        Exhaust => "exhaust",
        Innate => "innate",
        Retain => "retain",
        Unplayable => "unplayable",
        // Mythology
        Divine => "divine",
        Ritual => "ritual",
        Mummy => "mummy",
        Pharaoh => "pharaoh",
        Anubis => "anubis",
        Thoth => "thoth",
        Isis => "isis",
        Osiris => "osiris",
        Horus => "horus",
        Set => "set",
        Bastet => "bastet",
        Sekhmet => "sekhmet",
        // Creatures
        Beast => "beast",
        Spirit => "spirit",
        Undead => "undead",
        Shadow => "shadow",
        Elemental => "elemental",
        Demon => "demon",
        God => "god",
        // Places
        Desert => "desert",
        Tomb => "tomb",
        Temple => "temple",
        Underworld => "underworld",
        Duat => "duat",
        Pyramid => "pyramid",
    }
}

impl Keyword {
    /// Deity keywords. A card may invoke at most one of them.
    pub const GODS: [Keyword; 8] = [
        Keyword::Anubis,
        Keyword::Thoth,
        Keyword::Isis,
        Keyword::Osiris,
        Keyword::Horus,
        Keyword::Set,
        Keyword::Bastet,
        Keyword::Sekhmet,
    ];

    /// Keywords whose cards are expected to describe themselves in Egyptian
    /// terms.
    pub const EGYPTIAN_THEMED: [Keyword; 6] = [
        Keyword::Divine,
        Keyword::Ritual,
        Keyword::Mummy,
        Keyword::Pharaoh,
        Keyword::Anubis,
        Keyword::Thoth,
    ];

    /// Mechanical keyword pairs that cannot appear on the same card.
    pub const CONFLICTING_PAIRS: [(Keyword, Keyword); 2] = [
        (Keyword::Exhaust, Keyword::Retain),
        (Keyword::Ethereal, Keyword::Innate),
    ];

    pub fn is_god(self) -> bool {
        Self::GODS.contains(&self)
    }
}

// ===========================================================================
// Enemies and events
// ===========================================================================

vocabulary! {
    pub enum AiPattern ("AI pattern") {
        Aggressive => "aggressive",
        Defensive => "defensive",
        Balanced => "balanced",
        Erratic => "erratic",
        Tactical => "tactical",
        Berserker => "berserker",
        Support => "support",
        Controller => "controller",
    }
}

vocabulary! {
    pub enum EventType ("event type") {
        Choice => "choice",
        Combat => "combat",
        Shop => "shop",
        Shrine => "shrine",
        Treasure => "treasure",
        Challenge => "challenge",
        Rest => "rest",
        Mystery => "mystery",
        Boss => "boss",
        Story => "story",
    }
}

vocabulary! {
    /// The twelve hours of the night journey, in progression order.
    pub enum HourOfNight ("hour of night") {
        First => "first_hour",
        Second => "second_hour",
        Third => "third_hour",
        Fourth => "fourth_hour",
        Fifth => "fifth_hour",
        Sixth => "sixth_hour",
        Seventh => "seventh_hour",
        Eighth => "eighth_hour",
        Ninth => "ninth_hour",
        Tenth => "tenth_hour",
        Eleventh => "eleventh_hour",
        Twelfth => "twelfth_hour",
    }
}

// ===========================================================================
// Reference vocabularies
// ===========================================================================
//
// Values referenced from free-form effect metadata. These are checked by the
// cross-reference pass rather than at parse time, so an unknown value is a
// warning and never drops the item.

vocabulary! {
    pub enum CardPool ("card pool") {
        DivineCards => "divine_cards",
        KnowledgeCards => "knowledge_cards",
        SpiritCards => "spirit_cards",
        ForbiddenKnowledge => "forbidden_knowledge",
        MemoryCards => "memory_cards",
        DecayCards => "decay_cards",
        TruthCards => "truth_cards",
        IsisMagic => "isis_magic",
        GuideCards => "guide_cards",
        CombatTechniques => "combat_techniques",
        Any => "any",
    }
}

vocabulary! {
    pub enum BlessingType ("blessing type") {
        SafePassage => "safe_passage",
        DivineFavor => "divine_favor",
        Protection => "protection",
        SoulPeace => "soul_peace",
        Purification => "purification",
        Wisdom => "wisdom",
        Freedom => "freedom",
        Order => "order",
        DivineProtection => "divine_protection",
        TacticalInsight => "tactical_insight",
        DeathMastery => "death_mastery",
        DivineJudgment => "divine_judgment",
        PureHeart => "pure_heart",
        PerfectSoul => "perfect_soul",
        Acceptance => "acceptance",
        Truth => "truth",
        Purity => "purity",
        MaternalProtection => "maternal_protection",
        Transcendence => "transcendence",
        DivineAscension => "divine_ascension",
        Enlightenment => "enlightenment",
        EternalLife => "eternal_life",
    }
}

vocabulary! {
    pub enum CurseType ("curse type") {
        MirageSickness => "mirage_sickness",
        ForbiddenKnowledge => "forbidden_knowledge",
        DecayTouch => "decay_touch",
    }
}

vocabulary! {
    pub enum BuffType ("buff type") {
        Strength => "strength",
        Dexterity => "dexterity",
        Regeneration => "regeneration",
        Intangible => "intangible",
        Thorns => "thorns",
    }
}

vocabulary! {
    pub enum DebuffType ("debuff type") {
        Poison => "poison",
        Weak => "weak",
        Vulnerable => "vulnerable",
        Curse => "curse",
    }
}

/// Which closed vocabulary an effect's metadata key is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataVocabulary {
    Blessing,
    Curse,
    Buff,
    Debuff,
}

impl MetadataVocabulary {
    /// The metadata key carrying the value.
    pub fn key(self) -> &'static str {
        match self {
            MetadataVocabulary::Blessing => "blessing_type",
            MetadataVocabulary::Curse => "curse_type",
            MetadataVocabulary::Buff => "buff_type",
            MetadataVocabulary::Debuff => "debuff_type",
        }
    }

    /// Whether `value` belongs to this vocabulary.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            MetadataVocabulary::Blessing => value.parse::<BlessingType>().is_ok(),
            MetadataVocabulary::Curse => value.parse::<CurseType>().is_ok(),
            MetadataVocabulary::Buff => value.parse::<BuffType>().is_ok(),
            MetadataVocabulary::Debuff => value.parse::<DebuffType>().is_ok(),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
