//! Canned answers for the `/fix` command.

const TOPIC_GAS: &str = "gas";
const TOPIC_STAKING: &str = "staking";
const TOPIC_SWITCH_RPC: &str = "switch_rpc";
const TOPIC_SCAM: &str = "scam";

/// Returns the canned answer for a `/fix` topic, or usage text for an empty
/// or unknown topic.
pub fn fix_content(topic: &str) -> &'static str {
    match topic {
        "" => "Usage: `/fix <topic>`. Topics: `gas`, `staking`, `switch_rpc`, `scam`.",
        TOPIC_GAS => {
            "**Gas fees:** Ensure you have enough APT for gas. Retry during low network \
             congestion. If the transaction fails, wait a few minutes and try again."
        }
        TOPIC_STAKING => {
            "**Staking unlock:** Use the same wallet you staked with. Unlock period must \
             complete before you can withdraw. Check the staking dashboard for the exact \
             unlock time."
        }
        TOPIC_SWITCH_RPC => {
            "**Switch RPC:** Use the recommended RPC from `/status` or `/rpc`. In your wallet \
             or dApp settings, replace the current RPC URL with a healthy provider (e.g. Aptos \
             Labs fullnode: `https://fullnode.mainnet.aptoslabs.com/v1`)."
        }
        TOPIC_SCAM => {
            "**Scam safety:** Mods and admins never DM you first. Official support is only in \
             this server's channels. Never share your seed phrase or private keys. If someone \
             DMs you claiming to be support, it's a scam."
        }
        _ => "Unknown topic. Use one of: `gas`, `staking`, `switch_rpc`, `scam`.",
    }
}

/// All topics `/fix` understands.
pub fn all_fix_topics() -> [&'static str; 4] {
    [TOPIC_GAS, TOPIC_STAKING, TOPIC_SWITCH_RPC, TOPIC_SCAM]
}
