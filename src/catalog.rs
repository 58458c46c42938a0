use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::SyncError;

/// Only the two hardest difficulty tiers (Epic, Legendary) are tracked.
pub const TRACKED_TIERS: [i64; 2] = [3, 4];

/// Number of boss encounters ("sets") in a tier.
pub fn levels_in_tier(tier: i64) -> Result<i64, SyncError> {
    match tier {
        0..=2 => Ok(4),
        3 | 4 => Ok(5),
        _ => Err(SyncError::UnknownTier(tier)),
    }
}

pub fn tier_name(tier: i64) -> &'static str {
    match tier {
        0 => "Common",
        1 => "Uncommon",
        2 => "Rare",
        3 => "Epic",
        4 => "Legendary",
        _ => "Unknown",
    }
}

/// Boss key -> display name. Keys show up in the raid log as opaque
/// identifiers; a miss here means the game added a boss and the table
/// needs a manual update.
static BOSSES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("HiveTyrantGorgon", "Hive Tyrant (Hive fleet Gorgon)"),
        ("HiveTyrantKronos", "Hive Tyrant (Hive fleet Kronos)"),
        ("HiveTyrantLeviathan", "Hive Tyrant (Hive fleet Leviathan)"),
        ("TervigonGorgon", "Tervigon (Hive fleet Gorgon)"),
        ("TervigonKronos", "Tervigon (Hive fleet Kronos)"),
        ("TervigonLeviathan", "Tervigon (Hive fleet Leviathan)"),
        ("SilentKing", "Szarekh"),
        ("Ghazghkull", "Ghazghkull Mag Uruk Thraka"),
        ("Mortarion", "Mortarion"),
        ("ScreamerKiller", "Screamer-killer"),
        ("RogalDorn", "Rogal Dorn battle tank"),
        ("AvatarOfKhaine", "Avatar of Khaine"),
        ("Magnus", "Magnus"),
        ("Belisarius", "Belisarius Cawl"),
    ])
});

pub fn boss_display_name(key: &str) -> Result<&'static str, SyncError> {
    BOSSES
        .get(key)
        .copied()
        .ok_or_else(|| SyncError::UnknownBoss(key.to_string()))
}

/// Destination cells for one (tier, level) slot, relative to a season sheet.
#[derive(Debug, Clone, Copy)]
pub struct SlotRange {
    pub boss_name: &'static str,
    pub dmg: &'static str,
    pub battles: &'static str,
}

static SLOT_RANGES: LazyLock<HashMap<(i64, i64), SlotRange>> = LazyLock::new(|| {
    HashMap::from([
        ((3, 0), SlotRange { boss_name: "Q2", dmg: "Q4:Q33", battles: "R4:R33" }),
        ((3, 1), SlotRange { boss_name: "T2", dmg: "T4:T33", battles: "U4:U33" }),
        ((3, 2), SlotRange { boss_name: "W2", dmg: "W4:W33", battles: "X4:X33" }),
        ((3, 3), SlotRange { boss_name: "Z2", dmg: "Z4:Z33", battles: "AA4:AA33" }),
        ((3, 4), SlotRange { boss_name: "AC2", dmg: "AC4:AC33", battles: "AD4:AD33" }),
        ((4, 0), SlotRange { boss_name: "AF2", dmg: "AF4:AF33", battles: "AG4:AG33" }),
        ((4, 1), SlotRange { boss_name: "AI2", dmg: "AI4:AI33", battles: "AJ4:AJ33" }),
        ((4, 2), SlotRange { boss_name: "AL2", dmg: "AL4:AL33", battles: "AM4:AM33" }),
        ((4, 3), SlotRange { boss_name: "AO2", dmg: "AO4:AO33", battles: "AP4:AP33" }),
        ((4, 4), SlotRange { boss_name: "AR2", dmg: "AR4:AR33", battles: "AS4:AS33" }),
    ])
});

pub fn slot_range(tier: i64, level: i64) -> Result<SlotRange, SyncError> {
    SLOT_RANGES
        .get(&(tier, level))
        .copied()
        .ok_or(SyncError::UnknownSlot { tier, level })
}
