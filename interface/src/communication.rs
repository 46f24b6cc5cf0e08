use zenoh::Session;
use edgefirst_schemas::std_msgs::Header;
use edgefirst_schemas::builtin_interfaces::Time;
use serde::{Deserialize, Serialize};
use kinematics::{JOINT_COUNT, JointConfiguration};
use log::warn;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JointState {
    pub header: Header,
    pub name: Vec<String>,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub effort: Vec<f64>,
}

impl Default for JointState {
    fn default() -> Self {
        Self {
            header: Header {
                stamp: Time::new(0, 0),
                frame_id: String::new(),
            },
            name: Vec::new(),
            position: Vec::new(),
            velocity: Vec::new(),
            effort: Vec::new(),
        }
    }
}

pub struct CommunicationLayer {
    session: Session,
    joint_state_key: String,
    joint_command_key: String,
    recovery_key: String,
}

impl CommunicationLayer {
    /// Opens a zenoh session, connecting to `endpoint` (e.g. `tcp/panda:7447`)
    /// when given, otherwise relying on scouting.
    pub async fn connect(endpoint: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = zenoh::config::Config::default();
        if let Some(endpoint) = endpoint {
            config
                .insert_json5("connect/endpoints", &format!("[\"{}\"]", endpoint))
                .map_err(|e| e.to_string())?;
        }
        let session = zenoh::open(config).await.map_err(|e| e.to_string())?;

        Ok(Self {
            session,
            joint_state_key: "rt/robot/joint_states".to_string(),
            joint_command_key: "rt/robot/joint_commands".to_string(),
            recovery_key: "rt/robot/error_recovery".to_string(),
        })
    }

    pub async fn publish_joint_command(&self, command: &JointConfiguration) -> Result<(), Box<dyn std::error::Error>> {
        let msg = to_ros_joint_state(command);
        let payload = encode_joint_state(&msg)?;
        self.session.put(&self.joint_command_key, payload).await.map_err(|e| e.to_string())?;
        Ok(())
    }

    pub async fn subscribe_joint_state<F>(&self, callback: F) -> Result<(), Box<dyn std::error::Error>>
    where F: Fn(JointConfiguration) + Send + Sync + 'static
    {
        let subscriber = self.session.declare_subscriber(&self.joint_state_key).await.map_err(|e| e.to_string())?;

        tokio::spawn(async move {
            while let Ok(sample) = subscriber.recv_async().await {
                let payload = sample.payload().to_bytes();
                match decode_joint_state(&payload) {
                    Some(msg) => match from_ros_joint_state(&msg) {
                        Some(joints) => callback(joints),
                        None => warn!("Ignoring JointState with {} positions", msg.position.len()),
                    },
                    None => warn!("Failed to deserialize JointState"),
                }
            }
        });
        Ok(())
    }

    /// Asks the robot driver to clear its error state. The first reply
    /// decides the outcome; no reply within `timeout` is a failure.
    pub async fn request_error_recovery(&self, timeout: Duration) -> Result<(), String> {
        let replies = self
            .session
            .get(&self.recovery_key)
            .timeout(timeout)
            .await
            .map_err(|e| e.to_string())?;

        match replies.recv_async().await {
            Ok(reply) => match reply.result() {
                Ok(_) => Ok(()),
                Err(err) => Err(format!(
                    "recovery refused: {}",
                    String::from_utf8_lossy(&err.payload().to_bytes())
                )),
            },
            Err(_) => Err("no recovery service answered".to_string()),
        }
    }
}

/// Serializes as CDR little endian, encapsulation header included.
pub fn encode_joint_state(msg: &JointState) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    Ok(cdr::serialize::<_, _, cdr::CdrLe>(msg, cdr::Infinite)?)
}

pub fn decode_joint_state(payload: &[u8]) -> Option<JointState> {
    // Skip the 4-byte ROS 2 CDR encapsulation header; little endian assumed.
    if payload.len() <= 4 {
        warn!("Received payload too short for ROS 2 message");
        return None;
    }
    let mut deserializer = cdr::Deserializer::<_, _, cdr::LittleEndian>::new(&payload[4..], cdr::Infinite);
    serde::Deserialize::deserialize(&mut deserializer).ok()
}

fn to_ros_joint_state(command: &JointConfiguration) -> JointState {
    let mut msg = JointState::default();

    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    msg.header.stamp = Time::new(now.as_secs() as i32, now.subsec_nanos());
    msg.header.frame_id = "robot_base".to_string();

    for (i, angle) in command.iter().enumerate() {
        msg.name.push(format!("joint_{}", i + 1));
        msg.position.push(angle);
    }
    msg
}

fn from_ros_joint_state(msg: &JointState) -> Option<JointConfiguration> {
    if msg.position.len() != JOINT_COUNT {
        return None;
    }
    JointConfiguration::from_slice(&msg.position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_message() {
        let command = JointConfiguration::new([0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]);
        let msg = to_ros_joint_state(&command);

        assert_eq!(msg.header.frame_id, "robot_base");
        assert_eq!(msg.name.first().map(String::as_str), Some("joint_1"));
        assert_eq!(msg.name.last().map(String::as_str), Some("joint_7"));
        assert_eq!(msg.position, command.to_array().to_vec());
    }

    #[test]
    fn test_encoded_command_decodes_as_joint_state() {
        let command = JointConfiguration::new([0.0, -0.785, 0.0, -2.356, 0.0, 1.571, 0.785]);
        let payload = encode_joint_state(&to_ros_joint_state(&command)).unwrap();

        assert_eq!(&payload[..4], &[0x00, 0x01, 0x00, 0x00]);
        let decoded = decode_joint_state(&payload).unwrap();
        assert_eq!(from_ros_joint_state(&decoded), Some(command));
    }

    #[test]
    fn test_rejects_wrong_joint_count_and_short_payloads() {
        let msg = JointState {
            position: vec![0.0; 6],
            ..Default::default()
        };
        assert_eq!(from_ros_joint_state(&msg), None);
        assert!(decode_joint_state(&[0x00, 0x01, 0x00, 0x00]).is_none());
    }
}
