use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(GroupId);
id_newtype!(RecordId);

impl GroupId {
    /// Parent sentinel carried by root groups.
    pub const ROOT: GroupId = GroupId(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}
