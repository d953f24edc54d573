#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
pub struct TranscriptDto {
    pub video_id: String,
    pub transcript: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
pub struct ErrorDto {
    pub error: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
pub struct HealthDto {
    pub status: String,
    pub service: String,
}
