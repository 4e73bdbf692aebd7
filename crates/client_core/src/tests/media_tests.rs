use super::*;

use shared::domain::Scene;

const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

fn scene(number: i64, title: &str) -> Scene {
    Scene {
        scene_number: number,
        title: title.to_string(),
        narrative_script: String::new(),
        visual_prompt: String::new(),
        camera_shot: String::new(),
    }
}

#[test]
fn safe_title_replaces_lowercases_and_truncates() {
    assert_eq!(safe_title("The Red Dust!"), "the_red_dust_");
    assert_eq!(
        safe_title("An Extremely Long Scene Title That Keeps Going"),
        "an_extremely_long_scene_title_"
    );
    assert_eq!(safe_title("火星"), "__");
}

#[test]
fn filenames_follow_scene_number_and_title() {
    assert_eq!(scene_image_filename(3, "Arrival"), "scene_3_arrival.png");
    assert_eq!(export_dir_name("Mars: Alone"), "Mars__Alone_storyboard");
}

#[test]
fn exports_only_complete_images() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storyboard = StoryboardData {
        title: "Lone Astronaut".into(),
        art_style: "grain".into(),
        scenes: vec![scene(1, "Landing"), scene(2, "Storm"), scene(2, "Storm Again")],
    };
    let images = HashMap::from([
        (0, GeneratedImage::ready(1, PNG_DATA_URL)),
        (1, GeneratedImage::failed(2)),
        (2, GeneratedImage::ready(2, PNG_DATA_URL)),
    ]);

    let summary = export_storyboard(dir.path(), &storyboard, &images).expect("export");

    assert_eq!(summary.directory, dir.path().join("Lone_Astronaut_storyboard"));
    let names: Vec<_> = summary
        .files
        .iter()
        .map(|p| p.file_name().expect("name").to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["scene_1_landing.png", "scene_2_storm_again.png"]);
    let written = fs::read(&summary.files[0]).expect("read");
    assert_eq!(written, vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
}

#[test]
fn export_without_images_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storyboard = StoryboardData {
        title: "Empty".into(),
        art_style: String::new(),
        scenes: vec![scene(1, "Only")],
    };
    let images = HashMap::from([(0, GeneratedImage::loading(1))]);
    assert!(matches!(
        export_storyboard(dir.path(), &storyboard, &images),
        Err(ExportError::NothingToExport)
    ));
}

#[test]
fn imports_image_file_as_data_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hero.jpg");
    fs::write(&path, [0xFF, 0xD8, 0xFF]).expect("write");

    let reference = import_reference_file(&path).expect("import");
    assert_eq!(reference, "data:image/jpeg;base64,/9j/");
}

#[test]
fn rejects_non_image_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    fs::write(&path, "hello").expect("write");
    assert!(import_reference_file(&path).is_err());
}
