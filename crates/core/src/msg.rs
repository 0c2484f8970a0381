//! Execute messages sent to managed contracts.

use serde::{Deserialize, Serialize};

use crate::plan::SignedPlan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    Crank(Crank),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Crank {
    /// Signed unification plan
    Plan(SignedPlan),
    /// Reward distribution takes no arguments
    Empty {},
}

impl ExecuteMsg {
    pub fn crank() -> Self {
        Self::Crank(Crank::Empty {})
    }

    pub fn unify(plan: SignedPlan) -> Self {
        Self::Crank(Crank::Plan(plan))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        coin::Coin,
        plan::{PlanSignature, Stage},
    };

    #[test]
    fn empty_crank() {
        let msg = serde_json::to_value(ExecuteMsg::crank()).unwrap();
        assert_eq!(msg, json!({ "crank": {} }));
    }

    #[test]
    fn signed_crank_layout() {
        let stage: Stage = [("pool1", "C")].into_iter().collect();
        let msg = ExecuteMsg::unify(SignedPlan {
            stages: vec![stage],
            funds: vec![Coin::new("A", 10u64)],
            signature: PlanSignature {
                timestamp: 7,
                pubkey: "02ab".into(),
                signature: "cd".into(),
            },
        });

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "crank": {
                    "stages": [[["pool1", "C"]]],
                    "funds": [{ "denom": "A", "amount": "10" }],
                    "signature": { "timestamp": 7, "pubkey": "02ab", "signature": "cd" }
                }
            })
        );
    }

    #[test]
    fn parses_back_into_the_same_variant() {
        let msg: ExecuteMsg = serde_json::from_str(r#"{"crank":{}}"#).unwrap();
        assert_eq!(msg, ExecuteMsg::crank());
    }
}
