use std::time::Duration;

pub const YOLO_MODEL_NAME: &str = "yolov8n.onnx";

/// Class label the monitor alerts on.
pub const PERSON_LABEL: &str = "person";

/// Detections must score strictly above this to count as a person.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Minimum time between two alert sequences.
pub const DEFAULT_WARNING_INTERVAL: Duration = Duration::from_millis(1430);

/// Pause between the alert decision and the evidence shot.
pub const DEFAULT_SHOOT_DELAY: Duration = Duration::from_millis(710);

pub const CAPTURE_WIDTH: u32 = 640;
pub const CAPTURE_HEIGHT: u32 = 480;
pub const DEFAULT_JPEG_QUALITY: u8 = 60;

pub const DEFAULT_SAVE_DIR: &str = "danger_shots";
pub const DEFAULT_LOG_FILE: &str = "danger_log.csv";
pub const LOG_HEADER: &str = "timestamp,filename";

/// `chrono` format for alert timestamps: `YYYYMMDD_HHMMSS_mmm`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

pub const S3_KEY_PREFIX: &str = "danger_shots/";
pub const DEFAULT_S3_REGION: &str = "ap-northeast-3";
pub const PRESIGNED_URL_TTL: Duration = Duration::from_secs(3600);

pub const ALERT_MESSAGE_PREFIX: &str = "[WARNING] Person detected in danger zone:";

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_NOTIFY_QUEUE_CAPACITY: usize = 4;

/// COCO-80 class names in YOLOv8 output order.
pub const COCO_CLASS_NAMES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
