use super::{
    decode,
    ApiRequest,
    QueueItClient,
    SearchFilter,
    Transport,
    WaitingRoom,
};
use crate::error::{
    ParseFailure,
    QueueItError,
};

impl<T: Transport> QueueItClient<T> {
    /// Lists the waiting rooms currently in the pre-queue or queue phase.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_active_rooms(&self, omit_test_rooms: bool) -> Result<Vec<WaitingRoom>, QueueItError> {
        let response = self
            .transport()
            .send(ApiRequest::SearchEvents {
                filters: vec![SearchFilter::ACTIVE_PHASES],
            })
            .await?;

        let rooms = parse_rooms(&response)?;
        debug!(count = rooms.len(), "fetched waiting rooms");

        if !omit_test_rooms {
            return Ok(rooms);
        }

        let rooms = drop_test_rooms(rooms);
        debug!(count = rooms.len(), "filtered out test waiting rooms");
        Ok(rooms)
    }
}

pub(crate) fn parse_rooms(response: &super::ApiResponse) -> Result<Vec<WaitingRoom>, QueueItError> {
    decode("waiting room search", response, |body| {
        serde_json::from_slice(body).map_err(ParseFailure::from)
    })
}

/// Removes test rooms, the search endpoint offers no filter for them.
pub fn drop_test_rooms(rooms: Vec<WaitingRoom>) -> Vec<WaitingRoom> {
    rooms.into_iter().filter(|room| !room.is_test).collect()
}
