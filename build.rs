const COMMANDS: &[&str] = &[
    "copy_photo_to_clipboard",
    "save_photo",
    "save_video",
    "share_image",
    "cancel_media_request",
];

fn main() {
    tauri_plugin::Builder::new(COMMANDS).build();
}
