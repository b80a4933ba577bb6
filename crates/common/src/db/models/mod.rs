//! SeaORM entity models
//!
//! Database entities for ForumPulse

mod post;

pub use post::{
    ActiveModel as PostActiveModel,
    Column as PostColumn,
    Entity as PostEntity,
    Model as StoredPost,
};
