//! This module contains the [Fork] enum and the per-fork EIP tables.

/// A named execution-layer fork.
///
/// Variants are declared in activation order, so the derived [Ord]
/// implementation reflects protocol history and `fork >= Fork::London`
/// reads as "London or later".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Fork {
    /// The genesis rule set.
    Frontier,
    /// Homestead (EIP-2, EIP-7).
    Homestead,
    /// Tangerine Whistle (EIP-150 gas repricing).
    Tangerine,
    /// Spurious Dragon (EIP-155/160/161/170).
    SpuriousDragon,
    /// Byzantium (Metropolis part 1).
    Byzantium,
    /// Constantinople, with the Petersburg EIP-1283 removal folded in.
    Constantinople,
    /// Istanbul.
    Istanbul,
    /// Berlin (typed transactions, warm/cold access).
    Berlin,
    /// London (EIP-1559 fee market).
    London,
    /// Paris (the Merge).
    Paris,
    /// Shanghai (withdrawals).
    Shanghai,
    /// Cancun (blobs, transient storage).
    Cancun,
    /// Prague (execution requests, set-code transactions).
    Prague,
    /// Osaka.
    Osaka,
}

impl Fork {
    /// All forks, in activation order.
    pub const ALL: [Self; 14] = [
        Self::Frontier,
        Self::Homestead,
        Self::Tangerine,
        Self::SpuriousDragon,
        Self::Byzantium,
        Self::Constantinople,
        Self::Istanbul,
        Self::Berlin,
        Self::London,
        Self::Paris,
        Self::Shanghai,
        Self::Cancun,
        Self::Prague,
        Self::Osaka,
    ];

    /// Returns the lowercase name of the fork.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Frontier => "frontier",
            Self::Homestead => "homestead",
            Self::Tangerine => "tangerine",
            Self::SpuriousDragon => "spurious_dragon",
            Self::Byzantium => "byzantium",
            Self::Constantinople => "constantinople",
            Self::Istanbul => "istanbul",
            Self::Berlin => "berlin",
            Self::London => "london",
            Self::Paris => "paris",
            Self::Shanghai => "shanghai",
            Self::Cancun => "cancun",
            Self::Prague => "prague",
            Self::Osaka => "osaka",
        }
    }

    /// Looks a fork up by its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|fork| fork.name() == name)
    }

    /// The EIPs first activated by this fork. Earlier forks' EIPs are
    /// inherited; see [Self::eip].
    const fn introduced_eips(self) -> &'static [u64] {
        match self {
            Self::Frontier => &[],
            Self::Homestead => &[2, 7],
            Self::Tangerine => &[150],
            Self::SpuriousDragon => &[155, 160, 161, 170],
            Self::Byzantium => &[100, 140, 196, 197, 198, 211, 214, 649, 658],
            Self::Constantinople => &[145, 1014, 1052, 1234],
            Self::Istanbul => &[152, 1108, 1344, 1884, 2028, 2200],
            Self::Berlin => &[2565, 2718, 2929, 2930],
            Self::London => &[1559, 3198, 3529, 3541],
            Self::Paris => &[3675, 4399],
            Self::Shanghai => &[3651, 3855, 3860, 4895],
            Self::Cancun => &[1153, 4788, 4844, 5656, 6780, 7516],
            Self::Prague => &[2537, 2935, 6110, 7002, 7251, 7623, 7685, 7691, 7702],
            Self::Osaka => &[7825, 7934, 7939],
        }
    }

    /// Returns `true` if the given EIP is active at this fork.
    ///
    /// Activation is cumulative: an EIP introduced by any fork up to and
    /// including `self` is considered active.
    pub fn eip(self, eip: u64) -> bool {
        Self::ALL
            .into_iter()
            .take_while(|fork| *fork <= self)
            .any(|fork| fork.introduced_eips().contains(&eip))
    }

    /// Picks between two values based on whether the given EIP is active.
    pub fn eip_select<T>(self, eip: u64, active: T, inactive: T) -> T {
        if self.eip(eip) {
            active
        } else {
            inactive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eip_activation_is_cumulative() {
        assert!(Fork::Homestead.eip(7));
        assert!(Fork::Osaka.eip(7));
        assert!(!Fork::Frontier.eip(7));

        assert!(Fork::London.eip(1559));
        assert!(!Fork::Berlin.eip(1559));

        assert!(Fork::Prague.eip(7702));
        assert!(!Fork::Cancun.eip(7702));
    }

    #[test]
    fn test_eip_select() {
        assert_eq!(Fork::Tangerine.eip_select(150, 700u64, 40u64), 700);
        assert_eq!(Fork::Homestead.eip_select(150, 700u64, 40u64), 40);
    }

    #[test]
    fn test_fork_ordering() {
        assert!(Fork::Frontier < Fork::Homestead);
        assert!(Fork::Prague > Fork::Cancun);
        assert!(Fork::Osaka >= Fork::Osaka);
    }

    #[test]
    fn test_name_round_trip() {
        for fork in Fork::ALL {
            assert_eq!(Fork::from_name(fork.name()), Some(fork));
        }
        assert_eq!(Fork::from_name("petersburg"), None);
    }
}
