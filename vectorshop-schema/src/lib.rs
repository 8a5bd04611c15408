pub mod envelope;
pub mod events;
pub mod requests;
pub mod rows;

pub use envelope::{Count, Data, Empty, Envelope, Token};
pub use events::{LeaderboardEntry, LeaderboardSource, NotificationPayload, RelayEvent};
pub use requests::{
    AddToCartRequest, AdjustExpRequest, AdjustPointsRequest, BulkOrderRequest,
    DeleteCartItemsRequest, LoginRequest, NewAddressRequest, SignupRequest, UpdateCartRequest,
};
pub use rows::{
    CartRow, NotificationRow, ProductThumbnailRow, RowId, TemporaryLeaderboardRow, UserRow,
    VariantRow,
};
